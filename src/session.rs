//! The game session aggregate.
//!
//! A [`GameSession`] is the root of one play-through: the player's stats,
//! market snapshot, holdings, IPO applications, trade log and gameplay log.
//! Child rows (expenses, stock history, futures contracts, income sources,
//! play log) live in their own tables and are owned by the session via its
//! id; the session never holds back-pointers.

use crate::config::GameConfig;
use crate::market::{FundKey, Sector, NAV_START};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// Why a game ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    Bankruptcy,
    Burnout,
    Completed,
}

/// Lifecycle of an IPO application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IpoStatus {
    Applied,
    Processed,
}

/// One IPO application, held on the session until listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpoApplication {
    pub name: String,
    pub amount: i64,
    pub status: IpoStatus,
    /// Month the application was made; listing resolves the month after.
    pub month: u32,
}

/// A mutual-fund holding: accumulated units and the rupees put in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FundHolding {
    pub units: f64,
    pub invested: i64,
}

/// One stock purchase, kept for profit calculations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub sector: Sector,
    pub units: f64,
    pub price: i64,
    pub month: u32,
}

/// Root aggregate for one play-through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: i64,
    pub user_id: i64,
    pub wealth: i64,
    pub happiness: i64,
    pub credit_score: i64,
    pub financial_literacy: i64,
    pub lifelines: i64,
    pub current_month: u32,
    pub current_level: u8,
    pub is_active: bool,
    pub stock_prices: BTreeMap<Sector, i64>,
    pub fund_navs: BTreeMap<FundKey, f64>,
    pub market_trends: BTreeMap<Sector, i32>,
    pub portfolio: BTreeMap<Sector, f64>,
    pub mutual_funds: BTreeMap<FundKey, FundHolding>,
    pub active_ipos: Vec<IpoApplication>,
    pub purchase_history: Vec<TradeRecord>,
    /// Cached total of active expense amounts, refreshed at month boundaries.
    pub recurring_expenses: i64,
    pub gameplay_log: String,
    pub final_report: Option<String>,
}

impl GameSession {
    /// A fresh session with starting stats. Market trajectories, prices and
    /// default expenses are seeded by the engine on top of this.
    pub fn new(user_id: i64, config: &GameConfig) -> Self {
        let mut session = Self {
            id: 0,
            user_id,
            wealth: config.starting_wealth,
            happiness: config.happiness_start,
            credit_score: config.credit_score_start,
            financial_literacy: 0,
            lifelines: config.starting_lifelines,
            current_month: config.start_month,
            current_level: 1,
            is_active: true,
            stock_prices: BTreeMap::new(),
            fund_navs: FundKey::ALL.iter().map(|&k| (k, NAV_START)).collect(),
            market_trends: Sector::ALL.iter().map(|&s| (s, 0)).collect(),
            portfolio: Sector::ALL.iter().map(|&s| (s, 0.0)).collect(),
            mutual_funds: BTreeMap::new(),
            active_ipos: Vec::new(),
            purchase_history: Vec::new(),
            recurring_expenses: 0,
            gameplay_log: String::new(),
            final_report: None,
        };
        session.refresh_level(config);
        session
    }

    /// Recomputes the capability level from the ladder. Returns true when
    /// the level changed.
    pub fn refresh_level(&mut self, config: &GameConfig) -> bool {
        let next = config.level_for(self.current_month, self.financial_literacy);
        if next != self.current_level {
            self.current_level = next;
            return true;
        }
        false
    }

    /// Clamps happiness and credit into their bounds and floors literacy
    /// at zero.
    pub fn clamp_stats(&mut self, config: &GameConfig) {
        self.happiness = self.happiness.clamp(config.min_happiness, config.max_happiness);
        self.credit_score = self.credit_score.clamp(config.min_credit, config.max_credit);
        self.financial_literacy = self.financial_literacy.max(0);
    }

    /// Appends one line to the gameplay log.
    pub fn append_log(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }
        if self.gameplay_log.is_empty() {
            self.gameplay_log = entry.to_string();
        } else {
            self.gameplay_log.push('\n');
            self.gameplay_log.push_str(entry);
        }
    }

    /// Current price for a sector. Sessions are seeded with all sector
    /// prices; 100 is the defensive default for unseeded test fixtures.
    pub fn stock_price(&self, sector: Sector) -> i64 {
        self.stock_prices.get(&sector).copied().unwrap_or(100)
    }

    /// Current NAV for a fund.
    pub fn fund_nav(&self, key: FundKey) -> f64 {
        self.fund_navs.get(&key).copied().unwrap_or(NAV_START)
    }

    /// Units held in a sector.
    pub fn units_held(&self, sector: Sector) -> f64 {
        self.portfolio.get(&sector).copied().unwrap_or(0.0)
    }

    /// True when any sector other than `sector` holds units.
    pub fn holds_other_sector(&self, sector: Sector) -> bool {
        self.portfolio.iter().any(|(&s, &units)| s != sector && units > 0.0)
    }

    /// True when no sector holds any units.
    pub fn portfolio_is_empty(&self) -> bool {
        self.portfolio.values().all(|&units| units <= 0.0)
    }

    /// Marked-to-market value of the stock portfolio, in whole rupees.
    pub fn portfolio_value(&self) -> i64 {
        self.portfolio
            .iter()
            .map(|(&sector, &units)| (units * self.stock_price(sector) as f64) as i64)
            .sum()
    }

    /// Marked-to-market value of all mutual-fund holdings.
    pub fn funds_value(&self) -> i64 {
        self.mutual_funds
            .iter()
            .map(|(&key, holding)| (holding.units * self.fund_nav(key)) as i64)
            .sum()
    }

    /// Cash plus stock portfolio value.
    pub fn net_worth(&self) -> i64 {
        self.wealth + self.portfolio_value()
    }
}
