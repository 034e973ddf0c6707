//! SQLite state store.
//!
//! Four logical aggregates (session, expenses, history, profile) plus
//! append-only logs (play log, stock history, futures contracts, seed
//! ticks). The session row keeps its typed maps (prices, portfolio, funds,
//! IPO applications, trade log) as JSON columns with stable key order.
//!
//! Every engine verb runs inside exactly one transaction obtained from
//! [`SessionStore::with_transaction`]; a failure rolls the whole operation
//! back so no partial mutation is ever visible.

use crate::contract::FuturesContract;
use crate::error::{GameError, Result};
use crate::expense::{ExpenseCategory, RecurringExpense};
use crate::history::{CareerStage, GameHistory, PlayerProfile};
use crate::income::{Frequency, IncomeSource, IncomeType};
use crate::market::Sector;
use crate::providers::SeedTick;
use crate::session::{EndReason, GameSession};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// Connection wrapper enforcing one-transaction-per-operation.
pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Opens (and migrates) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory store, used by tests and the CLI simulator.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Runs `f` inside a single transaction. Commits on `Ok`, rolls back on
    /// `Err`.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| GameError::Internal("store mutex poisoned".to_string()))?;
        let tx = conn.transaction().map_err(GameError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(GameError::from)?;
        Ok(out)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS session (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            wealth INTEGER NOT NULL,
            happiness INTEGER NOT NULL,
            credit_score INTEGER NOT NULL,
            financial_literacy INTEGER NOT NULL,
            lifelines INTEGER NOT NULL,
            current_month INTEGER NOT NULL,
            current_level INTEGER NOT NULL,
            is_active INTEGER NOT NULL,
            stock_prices TEXT NOT NULL,
            fund_navs TEXT NOT NULL,
            market_trends TEXT NOT NULL,
            portfolio TEXT NOT NULL,
            mutual_funds TEXT NOT NULL,
            active_ipos TEXT NOT NULL,
            purchase_history TEXT NOT NULL,
            recurring_expenses INTEGER NOT NULL,
            gameplay_log TEXT NOT NULL,
            final_report TEXT
        );
        CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY,
            session_id INTEGER NOT NULL REFERENCES session(id),
            name TEXT NOT NULL,
            amount INTEGER NOT NULL,
            category TEXT NOT NULL,
            is_essential INTEGER NOT NULL,
            inflation_rate REAL NOT NULL,
            started_month INTEGER NOT NULL,
            is_cancelled INTEGER NOT NULL,
            cancelled_month INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_expense_session ON expense(session_id);
        CREATE TABLE IF NOT EXISTS stock_history (
            id INTEGER PRIMARY KEY,
            session_id INTEGER NOT NULL REFERENCES session(id),
            sector TEXT NOT NULL,
            month INTEGER NOT NULL,
            price INTEGER NOT NULL,
            UNIQUE(session_id, sector, month)
        );
        CREATE TABLE IF NOT EXISTS futures_contract (
            id INTEGER PRIMARY KEY,
            session_id INTEGER NOT NULL REFERENCES session(id),
            sector TEXT NOT NULL,
            units REAL NOT NULL,
            strike_price INTEGER NOT NULL,
            spot_price_at_sale INTEGER NOT NULL,
            duration_months INTEGER NOT NULL,
            created_month INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS income_source (
            id INTEGER PRIMARY KEY,
            session_id INTEGER NOT NULL REFERENCES session(id),
            source_type TEXT NOT NULL,
            amount_base INTEGER NOT NULL,
            frequency TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS player_choice (
            id INTEGER PRIMARY KEY,
            session_id INTEGER NOT NULL REFERENCES session(id),
            card_id INTEGER NOT NULL,
            choice_id INTEGER,
            recorded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_choice_session ON player_choice(session_id);
        CREATE TABLE IF NOT EXISTS game_history (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            final_wealth INTEGER NOT NULL,
            final_happiness INTEGER NOT NULL,
            final_credit_score INTEGER NOT NULL,
            financial_literacy_score INTEGER NOT NULL,
            persona TEXT NOT NULL,
            end_reason TEXT NOT NULL,
            months_played INTEGER NOT NULL,
            played_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS player_profile (
            user_id INTEGER PRIMARY KEY,
            total_games INTEGER NOT NULL,
            highest_wealth INTEGER NOT NULL,
            highest_score INTEGER NOT NULL,
            highest_credit_score INTEGER NOT NULL,
            highest_happiness INTEGER NOT NULL,
            highest_stock_profit INTEGER NOT NULL,
            career_stage TEXT
        );
        CREATE TABLE IF NOT EXISTS market_tick (
            id INTEGER PRIMARY KEY,
            ticker TEXT NOT NULL,
            date TEXT NOT NULL,
            close REAL NOT NULL,
            rsi REAL NOT NULL,
            macd REAL NOT NULL,
            signal REAL NOT NULL,
            daily_return REAL NOT NULL,
            UNIQUE(ticker, date)
        );",
    )?;
    Ok(())
}

fn parse_enum<T: FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| GameError::Internal(format!("corrupt {} value '{}'", what, raw)))
}

// ================= SESSION =================

pub fn insert_session(conn: &Connection, session: &mut GameSession) -> Result<()> {
    conn.execute(
        "INSERT INTO session (
            user_id, wealth, happiness, credit_score, financial_literacy,
            lifelines, current_month, current_level, is_active,
            stock_prices, fund_navs, market_trends, portfolio, mutual_funds,
            active_ipos, purchase_history, recurring_expenses, gameplay_log,
            final_report
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            session.user_id,
            session.wealth,
            session.happiness,
            session.credit_score,
            session.financial_literacy,
            session.lifelines,
            session.current_month,
            session.current_level,
            session.is_active,
            serde_json::to_string(&session.stock_prices)?,
            serde_json::to_string(&session.fund_navs)?,
            serde_json::to_string(&session.market_trends)?,
            serde_json::to_string(&session.portfolio)?,
            serde_json::to_string(&session.mutual_funds)?,
            serde_json::to_string(&session.active_ipos)?,
            serde_json::to_string(&session.purchase_history)?,
            session.recurring_expenses,
            session.gameplay_log,
            session.final_report,
        ],
    )?;
    session.id = conn.last_insert_rowid();
    Ok(())
}

pub fn load_session(conn: &Connection, session_id: i64) -> Result<GameSession> {
    conn.query_row(
        "SELECT id, user_id, wealth, happiness, credit_score, financial_literacy,
                lifelines, current_month, current_level, is_active,
                stock_prices, fund_navs, market_trends, portfolio, mutual_funds,
                active_ipos, purchase_history, recurring_expenses, gameplay_log,
                final_report
         FROM session WHERE id = ?1",
        params![session_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, u32>(7)?,
                row.get::<_, u8>(8)?,
                row.get::<_, bool>(9)?,
                row.get::<_, String>(10)?,
                row.get::<_, String>(11)?,
                row.get::<_, String>(12)?,
                row.get::<_, String>(13)?,
                row.get::<_, String>(14)?,
                row.get::<_, String>(15)?,
                row.get::<_, String>(16)?,
                row.get::<_, i64>(17)?,
                row.get::<_, String>(18)?,
                row.get::<_, Option<String>>(19)?,
            ))
        },
    )
    .optional()?
    .ok_or_else(|| GameError::NotFound(format!("Session {} not found.", session_id)))
    .and_then(|row| {
        Ok(GameSession {
            id: row.0,
            user_id: row.1,
            wealth: row.2,
            happiness: row.3,
            credit_score: row.4,
            financial_literacy: row.5,
            lifelines: row.6,
            current_month: row.7,
            current_level: row.8,
            is_active: row.9,
            stock_prices: serde_json::from_str(&row.10)?,
            fund_navs: serde_json::from_str(&row.11)?,
            market_trends: serde_json::from_str(&row.12)?,
            portfolio: serde_json::from_str(&row.13)?,
            mutual_funds: serde_json::from_str(&row.14)?,
            active_ipos: serde_json::from_str(&row.15)?,
            purchase_history: serde_json::from_str(&row.16)?,
            recurring_expenses: row.17,
            gameplay_log: row.18,
            final_report: row.19,
        })
    })
}

pub fn update_session(conn: &Connection, session: &GameSession) -> Result<()> {
    let changed = conn.execute(
        "UPDATE session SET
            wealth = ?2, happiness = ?3, credit_score = ?4,
            financial_literacy = ?5, lifelines = ?6, current_month = ?7,
            current_level = ?8, is_active = ?9, stock_prices = ?10,
            fund_navs = ?11, market_trends = ?12, portfolio = ?13,
            mutual_funds = ?14, active_ipos = ?15, purchase_history = ?16,
            recurring_expenses = ?17, gameplay_log = ?18, final_report = ?19
         WHERE id = ?1",
        params![
            session.id,
            session.wealth,
            session.happiness,
            session.credit_score,
            session.financial_literacy,
            session.lifelines,
            session.current_month,
            session.current_level,
            session.is_active,
            serde_json::to_string(&session.stock_prices)?,
            serde_json::to_string(&session.fund_navs)?,
            serde_json::to_string(&session.market_trends)?,
            serde_json::to_string(&session.portfolio)?,
            serde_json::to_string(&session.mutual_funds)?,
            serde_json::to_string(&session.active_ipos)?,
            serde_json::to_string(&session.purchase_history)?,
            session.recurring_expenses,
            session.gameplay_log,
            session.final_report,
        ],
    )?;
    if changed == 0 {
        return Err(GameError::NotFound(format!("Session {} not found.", session.id)));
    }
    Ok(())
}

// ================= EXPENSES =================

pub fn insert_expense(conn: &Connection, expense: &mut RecurringExpense) -> Result<()> {
    conn.execute(
        "INSERT INTO expense (
            session_id, name, amount, category, is_essential, inflation_rate,
            started_month, is_cancelled, cancelled_month
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            expense.session_id,
            expense.name,
            expense.amount,
            expense.category.to_string(),
            expense.is_essential,
            expense.inflation_rate,
            expense.started_month,
            expense.is_cancelled,
            expense.cancelled_month,
        ],
    )?;
    expense.id = conn.last_insert_rowid();
    Ok(())
}

pub fn update_expense(conn: &Connection, expense: &RecurringExpense) -> Result<()> {
    conn.execute(
        "UPDATE expense SET amount = ?2, is_cancelled = ?3, cancelled_month = ?4 WHERE id = ?1",
        params![expense.id, expense.amount, expense.is_cancelled, expense.cancelled_month],
    )?;
    Ok(())
}

fn expense_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(RecurringExpense, String)> {
    Ok((
        RecurringExpense {
            id: row.get(0)?,
            session_id: row.get(1)?,
            name: row.get(2)?,
            amount: row.get(3)?,
            category: ExpenseCategory::Lifestyle, // patched by caller
            is_essential: row.get(5)?,
            inflation_rate: row.get(6)?,
            started_month: row.get(7)?,
            is_cancelled: row.get(8)?,
            cancelled_month: row.get(9)?,
        },
        row.get::<_, String>(4)?,
    ))
}

/// All non-cancelled expenses for a session, oldest first.
pub fn active_expenses(conn: &Connection, session_id: i64) -> Result<Vec<RecurringExpense>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, name, amount, category, is_essential,
                inflation_rate, started_month, is_cancelled, cancelled_month
         FROM expense WHERE session_id = ?1 AND is_cancelled = 0 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![session_id], expense_from_row)?;
    let mut expenses = Vec::new();
    for row in rows {
        let (mut expense, category) = row?;
        expense.category = parse_enum(&category, "expense category")?;
        expenses.push(expense);
    }
    Ok(expenses)
}

// ================= STOCK HISTORY =================

/// Persists one sector's full trajectory (months 1..=len).
pub fn insert_stock_trajectory(
    conn: &Connection,
    session_id: i64,
    sector: Sector,
    prices: &[i64],
) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO stock_history (session_id, sector, month, price) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (idx, &price) in prices.iter().enumerate() {
        stmt.execute(params![session_id, sector.to_string(), (idx + 1) as u32, price])?;
    }
    Ok(())
}

/// Price of every sector at a given month.
pub fn stock_prices_for_month(
    conn: &Connection,
    session_id: i64,
    month: u32,
) -> Result<BTreeMap<Sector, i64>> {
    let mut stmt = conn.prepare(
        "SELECT sector, price FROM stock_history WHERE session_id = ?1 AND month = ?2",
    )?;
    let rows = stmt.query_map(params![session_id, month], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut prices = BTreeMap::new();
    for row in rows {
        let (sector, price) = row?;
        prices.insert(parse_enum::<Sector>(&sector, "sector")?, price);
    }
    Ok(prices)
}

pub fn stock_history_count(conn: &Connection, session_id: i64) -> Result<u32> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM stock_history WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ================= FUTURES =================

pub fn insert_futures_contract(conn: &Connection, contract: &mut FuturesContract) -> Result<()> {
    conn.execute(
        "INSERT INTO futures_contract (
            session_id, sector, units, strike_price, spot_price_at_sale,
            duration_months, created_month
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            contract.session_id,
            contract.sector.to_string(),
            contract.units,
            contract.strike_price,
            contract.spot_price_at_sale,
            contract.duration_months,
            contract.created_month,
        ],
    )?;
    contract.id = conn.last_insert_rowid();
    Ok(())
}

pub fn futures_contracts(conn: &Connection, session_id: i64) -> Result<Vec<FuturesContract>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, sector, units, strike_price, spot_price_at_sale,
                duration_months, created_month
         FROM futures_contract WHERE session_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![session_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, u32>(6)?,
            row.get::<_, u32>(7)?,
        ))
    })?;
    let mut contracts = Vec::new();
    for row in rows {
        let row = row?;
        contracts.push(FuturesContract {
            id: row.0,
            session_id: row.1,
            sector: parse_enum(&row.2, "sector")?,
            units: row.3,
            strike_price: row.4,
            spot_price_at_sale: row.5,
            duration_months: row.6,
            created_month: row.7,
        });
    }
    Ok(contracts)
}

// ================= INCOME =================

pub fn insert_income_source(conn: &Connection, source: &mut IncomeSource) -> Result<()> {
    conn.execute(
        "INSERT INTO income_source (session_id, source_type, amount_base, frequency)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            source.session_id,
            source.source_type.to_string(),
            source.amount_base,
            source.frequency.to_string(),
        ],
    )?;
    source.id = conn.last_insert_rowid();
    Ok(())
}

pub fn income_sources(conn: &Connection, session_id: i64) -> Result<Vec<IncomeSource>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, source_type, amount_base, frequency
         FROM income_source WHERE session_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![session_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;
    let mut sources = Vec::new();
    for row in rows {
        let row = row?;
        sources.push(IncomeSource {
            id: row.0,
            session_id: row.1,
            source_type: parse_enum::<IncomeType>(&row.2, "income type")?,
            amount_base: row.3,
            frequency: parse_enum::<Frequency>(&row.4, "frequency")?,
        });
    }
    Ok(sources)
}

// ================= PLAY LOG =================

/// Appends one play-log row. `choice_id = None` records a skip.
pub fn insert_play(
    conn: &Connection,
    session_id: i64,
    card_id: i64,
    choice_id: Option<i64>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO player_choice (session_id, card_id, choice_id, recorded_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![session_id, card_id, choice_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn play_count(conn: &Connection, session_id: i64) -> Result<u32> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM player_choice WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Card ids already dealt to this session.
pub fn shown_card_ids(conn: &Connection, session_id: i64) -> Result<HashSet<i64>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT card_id FROM player_choice WHERE session_id = ?1")?;
    let rows = stmt.query_map(params![session_id], |row| row.get::<_, i64>(0))?;
    let mut ids = HashSet::new();
    for row in rows {
        ids.insert(row?);
    }
    Ok(ids)
}

// ================= HISTORY & PROFILE =================

pub fn insert_game_history(conn: &Connection, history: &mut GameHistory) -> Result<()> {
    conn.execute(
        "INSERT INTO game_history (
            user_id, final_wealth, final_happiness, final_credit_score,
            financial_literacy_score, persona, end_reason, months_played,
            played_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            history.user_id,
            history.final_wealth,
            history.final_happiness,
            history.final_credit_score,
            history.financial_literacy_score,
            history.persona,
            history.end_reason.to_string(),
            history.months_played,
            history.played_at.to_rfc3339(),
        ],
    )?;
    history.id = conn.last_insert_rowid();
    Ok(())
}

pub fn game_history_for_user(conn: &Connection, user_id: i64) -> Result<Vec<GameHistory>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, final_wealth, final_happiness, final_credit_score,
                financial_literacy_score, persona, end_reason, months_played,
                played_at
         FROM game_history WHERE user_id = ?1 ORDER BY id DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, u32>(8)?,
            row.get::<_, String>(9)?,
        ))
    })?;
    let mut entries = Vec::new();
    for row in rows {
        let row = row?;
        entries.push(GameHistory {
            id: row.0,
            user_id: row.1,
            final_wealth: row.2,
            final_happiness: row.3,
            final_credit_score: row.4,
            financial_literacy_score: row.5,
            persona: row.6,
            end_reason: parse_enum::<EndReason>(&row.7, "end reason")?,
            months_played: row.8,
            played_at: parse_timestamp(&row.9)?,
        });
    }
    Ok(entries)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| GameError::Internal(format!("corrupt timestamp '{}'", raw)))
}

pub fn load_profile(conn: &Connection, user_id: i64) -> Result<Option<PlayerProfile>> {
    let row = conn
        .query_row(
            "SELECT user_id, total_games, highest_wealth, highest_score,
                    highest_credit_score, highest_happiness, highest_stock_profit,
                    career_stage
             FROM player_profile WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            },
        )
        .optional()?;
    match row {
        None => Ok(None),
        Some(row) => {
            let career_stage = match row.7 {
                Some(raw) => Some(parse_enum::<CareerStage>(&raw, "career stage")?),
                None => None,
            };
            Ok(Some(PlayerProfile {
                user_id: row.0,
                total_games: row.1,
                highest_wealth: row.2,
                highest_score: row.3,
                highest_credit_score: row.4,
                highest_happiness: row.5,
                highest_stock_profit: row.6,
                career_stage,
            }))
        }
    }
}

pub fn upsert_profile(conn: &Connection, profile: &PlayerProfile) -> Result<()> {
    conn.execute(
        "INSERT INTO player_profile (
            user_id, total_games, highest_wealth, highest_score,
            highest_credit_score, highest_happiness, highest_stock_profit,
            career_stage
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(user_id) DO UPDATE SET
            total_games = excluded.total_games,
            highest_wealth = excluded.highest_wealth,
            highest_score = excluded.highest_score,
            highest_credit_score = excluded.highest_credit_score,
            highest_happiness = excluded.highest_happiness,
            highest_stock_profit = excluded.highest_stock_profit,
            career_stage = excluded.career_stage",
        params![
            profile.user_id,
            profile.total_games,
            profile.highest_wealth,
            profile.highest_score,
            profile.highest_credit_score,
            profile.highest_happiness,
            profile.highest_stock_profit,
            profile.career_stage.map(|c| c.to_string()),
        ],
    )?;
    Ok(())
}

// ================= MARKET SEED TICKS =================

pub fn insert_seed_tick(conn: &Connection, tick: &SeedTick) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO market_tick (
            ticker, date, close, rsi, macd, signal, daily_return
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tick.ticker,
            tick.date.to_string(),
            tick.close,
            tick.rsi,
            tick.macd,
            tick.signal,
            tick.daily_return,
        ],
    )?;
    Ok(())
}

/// All ticks for a ticker, oldest first.
pub fn seed_ticks(conn: &Connection, ticker: &str) -> Result<Vec<SeedTick>> {
    let mut stmt = conn.prepare(
        "SELECT ticker, date, close, rsi, macd, signal, daily_return
         FROM market_tick WHERE ticker = ?1 ORDER BY date",
    )?;
    let rows = stmt.query_map(params![ticker], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, f64>(5)?,
            row.get::<_, f64>(6)?,
        ))
    })?;
    let mut ticks = Vec::new();
    for row in rows {
        let row = row?;
        let date = NaiveDate::from_str(&row.1)
            .map_err(|_| GameError::Internal(format!("corrupt tick date '{}'", row.1)))?;
        ticks.push(SeedTick {
            ticker: row.0,
            date,
            close: row.2,
            rsi: row.3,
            macd: row.4,
            signal: row.5,
            daily_return: row.6,
        });
    }
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::expense::default_expenses;
    use crate::market::FundKey;
    use crate::session::{FundHolding, IpoApplication, IpoStatus};
    use tempfile::NamedTempFile;

    fn store() -> SessionStore {
        SessionStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_open_on_disk_creates_schema() {
        let file = NamedTempFile::new().unwrap();
        let store = SessionStore::open(file.path()).unwrap();
        store
            .with_transaction(|conn| {
                let tables: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
                        [],
                        |row| row.get(0),
                    )
                    .map_err(GameError::from)?;
                assert_eq!(tables, 9);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_session_round_trip() {
        let store = store();
        let config = GameConfig::default();
        store
            .with_transaction(|conn| {
                let mut session = GameSession::new(7, &config);
                session.stock_prices.insert(Sector::Tech, 500);
                session.portfolio.insert(Sector::Tech, 1.25);
                session
                    .mutual_funds
                    .insert(FundKey::Nifty50, FundHolding { units: 5.0, invested: 500 });
                session.active_ipos.push(IpoApplication {
                    name: "Zomato".into(),
                    amount: 20_000,
                    status: IpoStatus::Applied,
                    month: 6,
                });
                session.append_log("Month 1: something happened");
                insert_session(conn, &mut session)?;
                assert!(session.id > 0);

                let loaded = load_session(conn, session.id)?;
                assert_eq!(loaded.user_id, 7);
                assert_eq!(loaded.stock_prices[&Sector::Tech], 500);
                assert_eq!(loaded.portfolio[&Sector::Tech], 1.25);
                assert_eq!(loaded.mutual_funds[&FundKey::Nifty50].units, 5.0);
                assert_eq!(loaded.active_ipos[0].name, "Zomato");
                assert_eq!(loaded.gameplay_log, "Month 1: something happened");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_load_missing_session_is_not_found() {
        let store = store();
        let err = store.with_transaction(|conn| load_session(conn, 99)).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_update_session_persists_changes() {
        let store = store();
        let config = GameConfig::default();
        store
            .with_transaction(|conn| {
                let mut session = GameSession::new(1, &config);
                insert_session(conn, &mut session)?;
                session.wealth = 12_345;
                session.is_active = false;
                session.final_report = Some("## Summary".into());
                update_session(conn, &session)?;

                let loaded = load_session(conn, session.id)?;
                assert_eq!(loaded.wealth, 12_345);
                assert!(!loaded.is_active);
                assert_eq!(loaded.final_report.as_deref(), Some("## Summary"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = store();
        let config = GameConfig::default();
        let result: Result<()> = store.with_transaction(|conn| {
            let mut session = GameSession::new(1, &config);
            insert_session(conn, &mut session)?;
            Err(GameError::Internal("boom".into()))
        });
        assert!(result.is_err());

        // Nothing committed.
        store
            .with_transaction(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM session", [], |row| row.get(0))
                    .map_err(GameError::from)?;
                assert_eq!(count, 0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_expense_lifecycle() {
        let store = store();
        let config = GameConfig::default();
        store
            .with_transaction(|conn| {
                let mut session = GameSession::new(1, &config);
                insert_session(conn, &mut session)?;
                for mut expense in default_expenses(session.id, 1) {
                    insert_expense(conn, &mut expense)?;
                }

                let mut active = active_expenses(conn, session.id)?;
                assert_eq!(active.len(), 4);
                let total: i64 = active.iter().map(|e| e.amount).sum();
                assert_eq!(total, 14_500);

                // Cancel one and verify it drops out of the active set.
                active[0].cancel(3);
                update_expense(conn, &active[0])?;
                assert_eq!(active_expenses(conn, session.id)?.len(), 3);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_stock_history_round_trip() {
        let store = store();
        let config = GameConfig::default();
        store
            .with_transaction(|conn| {
                let mut session = GameSession::new(1, &config);
                insert_session(conn, &mut session)?;
                insert_stock_trajectory(conn, session.id, Sector::Tech, &[500, 510, 520])?;
                insert_stock_trajectory(conn, session.id, Sector::Gold, &[1800, 1810, 1820])?;

                let prices = stock_prices_for_month(conn, session.id, 2)?;
                assert_eq!(prices[&Sector::Tech], 510);
                assert_eq!(prices[&Sector::Gold], 1810);
                assert_eq!(stock_history_count(conn, session.id)?, 6);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_play_log_counts_and_shown_ids() {
        let store = store();
        let config = GameConfig::default();
        store
            .with_transaction(|conn| {
                let mut session = GameSession::new(1, &config);
                insert_session(conn, &mut session)?;
                insert_play(conn, session.id, 10, Some(101))?;
                insert_play(conn, session.id, 11, None)?; // a skip
                insert_play(conn, session.id, 10, Some(102))?;

                assert_eq!(play_count(conn, session.id)?, 3);
                let shown = shown_card_ids(conn, session.id)?;
                assert_eq!(shown.len(), 2);
                assert!(shown.contains(&10) && shown.contains(&11));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_profile_upsert_and_history() {
        let store = store();
        store
            .with_transaction(|conn| {
                assert!(load_profile(conn, 5)?.is_none());

                let mut profile = PlayerProfile::new(5);
                profile.record_game(30_000, 2_000, 55, 710, 88);
                upsert_profile(conn, &profile)?;

                let mut history = GameHistory {
                    id: 0,
                    user_id: 5,
                    final_wealth: 30_000,
                    final_happiness: 88,
                    final_credit_score: 710,
                    financial_literacy_score: 55,
                    persona: "The Balanced Spender".into(),
                    end_reason: EndReason::Completed,
                    months_played: 61,
                    played_at: Utc::now(),
                };
                insert_game_history(conn, &mut history)?;

                let loaded = load_profile(conn, 5)?.unwrap();
                assert_eq!(loaded.total_games, 1);
                assert_eq!(loaded.highest_wealth, 32_000);

                let games = game_history_for_user(conn, 5)?;
                assert_eq!(games.len(), 1);
                assert_eq!(games[0].end_reason, EndReason::Completed);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_seed_ticks_ordered_by_date() {
        let store = store();
        store
            .with_transaction(|conn| {
                for (day, close) in [(2, 102.0), (1, 100.0), (3, 104.0)] {
                    insert_seed_tick(
                        conn,
                        &SeedTick {
                            ticker: "RELIANCE.NS".into(),
                            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                            close,
                            rsi: 50.0,
                            macd: 0.0,
                            signal: 0.0,
                            daily_return: 0.0,
                        },
                    )?;
                }
                let ticks = seed_ticks(conn, "RELIANCE.NS")?;
                assert_eq!(ticks.len(), 3);
                assert_eq!(ticks[0].close, 100.0);
                assert_eq!(ticks[2].close, 104.0);
                assert!(seed_ticks(conn, "TCS.NS")?.is_empty());
                Ok(())
            })
            .unwrap();
    }
}
