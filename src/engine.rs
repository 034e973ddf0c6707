//! The game engine: session lifecycle, turn processing, month advancement,
//! trading, and finalisation.
//!
//! One engine serves many sessions. Requests for different sessions run in
//! parallel; operations on the same session are serialised through a
//! per-session lock, and every verb executes inside a single store
//! transaction so a failure never leaves partial state behind.
//!
//! External collaborators (scenario generator, report renderer, forecaster,
//! advisor, translator) are injected via [`Providers`]; every one of them
//! has a deterministic fallback, so the engine never blocks on or fails
//! from a collaborator outage.

use crate::advisor::{Advice, CharacterId, ChatbotMessage};
use crate::card::{CardCategory, ScenarioCard};
use crate::config::{GameConfig, IpoListing};
use crate::contract::{futures_quote, FuturesContract};
use crate::deck;
use crate::dice::Dice;
use crate::error::{GameError, Result};
use crate::expense::{ExpenseCategory, RecurringExpense};
use crate::history::{CareerStage, GameHistory, PlayerProfile};
use crate::market::{self, FundKey, Sector};
use crate::providers::Providers;
use crate::report::{persona_for, portfolio_breakdown, render_template, Persona};
use crate::session::{EndReason, FundHolding, GameSession, IpoApplication, IpoStatus, TradeRecord};
use crate::store::{self, SessionStore};
use chrono::Utc;
use log::{debug, info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use strum_macros::{Display, EnumString};

/// Wealth below which monthly financial stress bites.
const STRESS_WEALTH_THRESHOLD: i64 = 10_000;

/// Happiness above which hedonic adaptation shaves a point each month.
const HEDONIC_THRESHOLD: i64 = 90;

/// Scam trigger probability per month boundary.
const SCAM_PROBABILITY: f64 = 0.10;

/// Minimum cash before Sundar bothers calling.
const SCAM_MIN_WEALTH: i64 = 10_000;

/// Idle cash threshold for the Harshad trigger.
const IDLE_CASH_THRESHOLD: i64 = 50_000;

/// Loan products on offer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanType {
    Family,
    InstantApp,
}

/// Result envelope returned by every state-mutating verb.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub session: GameSession,
    pub message: String,
    /// True when this operation crossed at least one month boundary.
    pub month_advanced: bool,
    pub game_over: bool,
    pub game_over_reason: Option<EndReason>,
    pub final_persona: Option<Persona>,
    pub chatbot: Option<ChatbotMessage>,
}

impl TurnOutcome {
    fn simple(session: GameSession, message: String) -> Self {
        Self {
            session,
            message,
            month_advanced: false,
            game_over: false,
            game_over_reason: None,
            final_persona: None,
            chatbot: None,
        }
    }
}

/// Response to a lifeline use.
#[derive(Debug, Clone, Serialize)]
pub struct LifelineHint {
    pub hint: String,
    pub choice_id: i64,
    pub lifelines_remaining: i64,
}

/// Snapshot returned by `get_market_status`.
#[derive(Debug, Clone, Serialize)]
pub struct MarketStatus {
    pub current_month: u32,
    pub stock_prices: BTreeMap<Sector, i64>,
    pub market_trends: BTreeMap<Sector, i32>,
    pub fund_navs: BTreeMap<FundKey, f64>,
    pub portfolio: BTreeMap<Sector, f64>,
    pub mutual_funds: BTreeMap<FundKey, FundHolding>,
    pub portfolio_value: i64,
    /// The IPO open for application this month, if any.
    pub open_ipo: Option<IpoListing>,
    pub active_ipos: Vec<IpoApplication>,
}

/// Outcome of one month advance, consumed by the turn processor.
struct MonthAdvance {
    report: String,
    game_over_reason: Option<EndReason>,
    chatbot: Option<ChatbotMessage>,
}

/// Registry of per-session locks serialising same-session operations.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    fn acquire(&self, session_id: i64) -> Result<Arc<Mutex<()>>> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| GameError::Internal("session lock registry poisoned".to_string()))?;
        Ok(Arc::clone(map.entry(session_id).or_default()))
    }
}

/// The simulation kernel.
pub struct GameEngine {
    config: GameConfig,
    store: SessionStore,
    deck: Vec<ScenarioCard>,
    providers: Providers,
    dice: Mutex<Box<dyn Dice>>,
    /// Cards minted by the scenario generator, kept so a follow-up
    /// `submit_choice` can resolve them by id.
    generated_cards: Mutex<HashMap<i64, ScenarioCard>>,
    locks: SessionLocks,
}

impl GameEngine {
    pub fn new(
        store: SessionStore,
        config: GameConfig,
        providers: Providers,
        dice: Box<dyn Dice>,
    ) -> Self {
        Self::with_deck(store, config, providers, dice, deck::builtin_deck())
    }

    /// Engine with a custom deck; used by tests and themed deployments.
    pub fn with_deck(
        store: SessionStore,
        config: GameConfig,
        providers: Providers,
        dice: Box<dyn Dice>,
        deck: Vec<ScenarioCard>,
    ) -> Self {
        Self {
            config,
            store,
            deck,
            providers,
            dice: Mutex::new(dice),
            generated_cards: Mutex::new(HashMap::new()),
            locks: SessionLocks::default(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Runs `f` with the session lock held, a transaction open, and the
    /// dice unlocked. Every verb goes through here.
    fn locked<T, F>(&self, session_id: i64, f: F) -> Result<T>
    where
        F: FnOnce(&Connection, &mut dyn Dice) -> Result<T>,
    {
        let lock = self.locks.acquire(session_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| GameError::Internal("session lock poisoned".to_string()))?;
        let mut dice = self
            .dice
            .lock()
            .map_err(|_| GameError::Internal("dice lock poisoned".to_string()))?;
        self.store.with_transaction(|conn| f(conn, &mut **dice))
    }

    fn check_owner(&self, session: &GameSession, user_id: i64) -> Result<()> {
        if session.user_id != user_id {
            return Err(GameError::PermissionDenied);
        }
        Ok(())
    }

    fn ensure_active(&self, session: &GameSession) -> Result<()> {
        if !session.is_active {
            return Err(GameError::NotFound("Session is not active.".to_string()));
        }
        Ok(())
    }

    fn find_card(&self, card_id: i64) -> Result<ScenarioCard> {
        if let Some(card) = self.deck.iter().find(|c| c.id == card_id) {
            return Ok(card.clone());
        }
        let generated = self
            .generated_cards
            .lock()
            .map_err(|_| GameError::Internal("generated card cache poisoned".to_string()))?;
        generated
            .get(&card_id)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("Card {} not found.", card_id)))
    }

    // ================= SESSION MGMT =================

    /// Creates a session: starting stats, four default bills, and the full
    /// 60-month price trajectory per sector. The tech trajectory comes from
    /// the forecast provider when enough seed ticks exist; everything else
    /// (and any forecast failure) uses GBM.
    pub fn start_new_session(&self, user_id: i64) -> Result<GameSession> {
        let mut dice = self
            .dice
            .lock()
            .map_err(|_| GameError::Internal("dice lock poisoned".to_string()))?;
        let dice = &mut **dice;
        self.store.with_transaction(|conn| {
            let mut session = GameSession::new(user_id, &self.config);
            store::insert_session(conn, &mut session)?;

            let ticks = store::seed_ticks(conn, &self.config.primary_ticker)?;
            let months = self.config.game_duration_months;

            for params in &self.config.sector_params {
                let forecasted = if params.sector == Sector::Tech
                    && ticks.len() >= self.config.min_seed_ticks
                {
                    match self.providers.forecast.forecast(&ticks, months) {
                        Ok(prices) if prices.len() == months as usize => Some(prices),
                        Ok(prices) => {
                            warn!(
                                "forecast returned {} months, expected {}; using GBM",
                                prices.len(),
                                months
                            );
                            None
                        }
                        Err(e) => {
                            warn!("forecast provider failed: {}; using GBM", e);
                            None
                        }
                    }
                } else {
                    None
                };

                let prices = forecasted.unwrap_or_else(|| {
                    market::gbm_trajectory(
                        params.start_price,
                        params.drift,
                        params.volatility,
                        months,
                        dice,
                    )
                });

                store::insert_stock_trajectory(conn, session.id, params.sector, &prices)?;
                session.stock_prices.insert(params.sector, prices[0]);
            }

            let mut total_bills = 0;
            for mut expense in crate::expense::default_expenses(session.id, session.current_month)
            {
                total_bills += expense.amount;
                store::insert_expense(conn, &mut expense)?;
            }
            session.recurring_expenses = total_bills;

            store::update_session(conn, &session)?;
            info!("session {} started for user {}", session.id, user_id);
            Ok(session)
        })
    }

    // ================= CORE GAMEPLAY =================

    /// Deals the next scenario card, or `None` when the deck is empty.
    ///
    /// With the configured probability the scenario generator is consulted
    /// first, scoped to a category drawn from the current level's allow
    /// list; any failure falls back to the built-in deck with staged filter
    /// relaxation.
    pub fn get_next_card(&self, user_id: i64, session_id: i64) -> Result<Option<ScenarioCard>> {
        self.locked(session_id, |conn, dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;
            if session.refresh_level(&self.config) {
                store::update_session(conn, &session)?;
            }

            let filter = self.config.filter_for_level(session.current_level);

            if dice.chance(self.config.ai_card_probability) {
                let category = match &filter.categories {
                    Some(categories) if !categories.is_empty() => {
                        categories[dice.index(categories.len())]
                    }
                    _ => CardCategory::Wants,
                };
                let profile = store::load_profile(conn, session.user_id)?;
                match self.providers.scenario_generator.generate(
                    profile.as_ref(),
                    session.wealth,
                    session.current_month,
                    category,
                ) {
                    Ok(Some(card)) => {
                        debug!("generated card {} ({})", card.id, card.title);
                        self.generated_cards
                            .lock()
                            .map_err(|_| {
                                GameError::Internal("generated card cache poisoned".to_string())
                            })?
                            .insert(card.id, card.clone());
                        return Ok(Some(card));
                    }
                    Ok(None) => {}
                    Err(e) => warn!("scenario generation failed: {}; using deck", e),
                }
            }

            let shown = store::shown_card_ids(conn, session_id)?;
            Ok(deck::select_card(&self.deck, session.current_month, filter, &shown, dice))
        })
    }

    /// Applies one choice: impacts, expense side effects, market shock,
    /// play log, month advancement, game-over check.
    pub fn submit_choice(
        &self,
        user_id: i64,
        session_id: i64,
        card_id: i64,
        choice_id: i64,
    ) -> Result<TurnOutcome> {
        let card = self.find_card(card_id)?;
        self.locked(session_id, |conn, dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;

            let choice = card
                .choice(choice_id)
                .ok_or_else(|| {
                    GameError::NotFound(format!("Choice {} is not on card {}.", choice_id, card_id))
                })?
                .clone();
            let month_at_play = session.current_month;

            // 1. Direct impacts.
            session.wealth += choice.wealth_impact;
            session.happiness += choice.happiness_impact;
            session.credit_score += choice.credit_impact;
            session.financial_literacy += choice.literacy_impact;
            session.clamp_stats(&self.config);

            let mut feedback_parts = Vec::new();
            if !choice.feedback.is_empty() {
                feedback_parts.push(choice.feedback.clone());
            }

            // 2. Expense side effect: add.
            if choice.adds_recurring_expense > 0 {
                let name = choice
                    .expense_name
                    .clone()
                    .unwrap_or_else(|| format!("Expense from '{}'", card.title));
                let mut expense = RecurringExpense::new(
                    session.id,
                    &name,
                    choice.adds_recurring_expense,
                    ExpenseCategory::Lifestyle,
                    false,
                    0.04,
                    session.current_month,
                );
                store::insert_expense(conn, &mut expense)?;
            }

            // 3. Expense side effect: cancel all matching active expenses.
            if let Some(target) = &choice.cancels_expense_name {
                let mut cancelled = 0;
                for mut expense in store::active_expenses(conn, session.id)? {
                    if &expense.name == target && expense.cancel(session.current_month) {
                        store::update_expense(conn, &expense)?;
                        cancelled += 1;
                    }
                }
                if cancelled > 0 {
                    feedback_parts.push(format!("(Cancelled {} subscription(s)!)", cancelled));
                }
            }

            // 4. Intra-month market shock.
            if let Some(event) = &card.market_event {
                if event.is_active {
                    let changes = market::apply_event_shock(&mut session, event);
                    if !changes.is_empty() {
                        feedback_parts.push(format!("MARKET NEWS: {}!", changes.join(", ")));
                    }
                }
            }

            // 5. Play log.
            store::insert_play(conn, session.id, card.id, Some(choice.id))?;

            // 6. Month advancement.
            let plays = store::play_count(conn, session.id)?;
            let target_month = plays / self.config.cards_per_month + 1;
            let mut month_advanced = false;
            let mut chatbot = None;
            let mut month_end: Option<EndReason> = None;
            while target_month > session.current_month && month_end.is_none() {
                month_advanced = true;
                let advance = self.advance_month_inner(conn, &mut session, dice)?;
                feedback_parts.push(advance.report);
                chatbot = advance.chatbot;
                month_end = advance.game_over_reason;
            }

            // 7. Game over.
            let reason = month_end.or_else(|| self.check_game_over(&session));
            let mut final_persona = None;
            if let Some(reason) = reason {
                self.finalize(conn, &mut session, reason)?;
                final_persona = Some(persona_for(&session));
            }

            // 8. Gameplay log.
            session.append_log(&format!(
                "Month {}: {}: chose '{}'. Impact: wealth {:+}, happiness {:+}, credit {:+}, literacy {:+}.",
                month_at_play,
                card.title,
                choice.text,
                choice.wealth_impact,
                choice.happiness_impact,
                choice.credit_impact,
                choice.literacy_impact,
            ));

            store::update_session(conn, &session)?;
            Ok(TurnOutcome {
                message: feedback_parts.join(" "),
                month_advanced,
                game_over: reason.is_some(),
                game_over_reason: reason,
                final_persona,
                chatbot,
                session,
            })
        })
    }

    /// Skips a card, applying the category-weighted penalty.
    pub fn skip_card(&self, user_id: i64, session_id: i64, card_id: i64) -> Result<TurnOutcome> {
        let card = self.find_card(card_id)?;
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;

            let (happiness_loss, credit_loss) = match card.category {
                CardCategory::Emergency | CardCategory::Needs => (15, 20),
                CardCategory::Investment => (5, 10),
                _ => (5, 5),
            };
            session.happiness -= happiness_loss;
            session.credit_score -= credit_loss;
            session.clamp_stats(&self.config);

            store::insert_play(conn, session.id, card.id, None)?;

            session.append_log(&format!(
                "Month {}: skipped '{}'. Penalty: happiness -{}, credit -{}.",
                session.current_month, card.title, happiness_loss, credit_loss
            ));

            let reason = self.check_game_over(&session);
            let mut final_persona = None;
            if let Some(reason) = reason {
                self.finalize(conn, &mut session, reason)?;
                final_persona = Some(persona_for(&session));
            }

            store::update_session(conn, &session)?;
            Ok(TurnOutcome {
                message: format!(
                    "Skipped! Penalty: -{} happiness, -{} credit score.",
                    happiness_loss, credit_loss
                ),
                month_advanced: false,
                game_over: reason.is_some(),
                game_over_reason: reason,
                final_persona,
                chatbot: None,
                session,
            })
        })
    }

    /// Spends a lifeline to reveal the recommended choice.
    pub fn use_lifeline(
        &self,
        user_id: i64,
        session_id: i64,
        card_id: i64,
    ) -> Result<LifelineHint> {
        let card = self.find_card(card_id)?;
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;

            if session.lifelines <= 0 {
                return Err(GameError::Validation("No lifelines remaining.".to_string()));
            }
            let choice = card
                .recommended_choice()
                .ok_or_else(|| GameError::NotFound("Card has no choices.".to_string()))?;

            session.lifelines -= 1;
            store::update_session(conn, &session)?;
            Ok(LifelineHint {
                hint: format!("Advisor suggests: {}", choice.text),
                choice_id: choice.id,
                lifelines_remaining: session.lifelines,
            })
        })
    }

    /// Contextual advice for a card, via the advisor contract.
    pub fn get_advice(&self, user_id: i64, session_id: i64, card_id: i64) -> Result<Advice> {
        let card = self.find_card(card_id)?;
        self.locked(session_id, |conn, _dice| {
            let session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            Ok(self.providers.advisor.advise(
                &card.title,
                &card.description,
                &card.choices,
                session.wealth,
                session.happiness,
            ))
        })
    }

    // ================= MONTH ADVANCEMENT =================

    /// Advances exactly one month outside the turn pipeline.
    ///
    /// Production flows through `submit_choice`, which calls the same month
    /// routine when the play count crosses a boundary; this entry point
    /// keeps the pipeline independently drivable (tests, ops tooling).
    pub fn advance_month(&self, user_id: i64, session_id: i64) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;

            let advance = self.advance_month_inner(conn, &mut session, dice)?;
            let mut final_persona = None;
            if let Some(reason) = advance.game_over_reason {
                self.finalize(conn, &mut session, reason)?;
                final_persona = Some(persona_for(&session));
            }
            store::update_session(conn, &session)?;
            Ok(TurnOutcome {
                message: advance.report,
                month_advanced: true,
                game_over: advance.game_over_reason.is_some(),
                game_over_reason: advance.game_over_reason,
                final_persona,
                chatbot: advance.chatbot,
                session,
            })
        })
    }

    /// The month pipeline. Order is material: income, then bills and
    /// inflation, then the market roll, then IPO listings, then soft decay,
    /// then the game-over check and character triggers.
    fn advance_month_inner(
        &self,
        conn: &Connection,
        session: &mut GameSession,
        dice: &mut dyn Dice,
    ) -> Result<MonthAdvance> {
        // 1. Time.
        session.current_month += 1;
        session.refresh_level(&self.config);
        let mut lines = vec![format!("Month {} started.", session.current_month)];
        debug!("session {} advancing to month {}", session.id, session.current_month);

        // 2. Income.
        let sources = store::income_sources(conn, session.id)?;
        let mut total_income = 0;
        if sources.is_empty() {
            total_income = self.config.monthly_salary;
            lines.push(format!("+\u{20B9}{} Salary credited.", total_income));
        } else {
            for source in &sources {
                let amount = source.monthly_payout(dice);
                if amount > 0 {
                    total_income += amount;
                    lines.push(format!(
                        "+\u{20B9}{} from {}.",
                        amount,
                        source.source_type.label()
                    ));
                } else {
                    lines.push(format!("No {} income this month.", source.source_type.label()));
                }
            }
        }
        session.wealth += total_income;

        // 3. Bills and annual inflation (months 13, 25, 37, ...).
        let apply_inflation = session.current_month > 1 && session.current_month % 12 == 1;
        let mut total_bills = 0;
        for mut expense in store::active_expenses(conn, session.id)? {
            if apply_inflation {
                if let Some((_, new_amount)) = expense.apply_inflation() {
                    store::update_expense(conn, &expense)?;
                    lines.push(format!(
                        "{} rose to \u{20B9}{} (+{:.0}%).",
                        expense.name,
                        new_amount,
                        expense.inflation_rate * 100.0
                    ));
                }
            }
            total_bills += expense.amount;
        }
        session.wealth -= total_bills;
        session.recurring_expenses = total_bills;
        lines.push(format!("-\u{20B9}{} total bills paid.", total_bills));

        // 4. Market roll.
        let month_prices =
            store::stock_prices_for_month(conn, session.id, session.current_month)?;
        let changes = market::roll_monthly_prices(session, &self.config, &month_prices, dice);
        if !changes.is_empty() {
            lines.push(format!("Market update: {}.", changes.join(", ")));
        }

        // 5. IPO listings.
        lines.extend(market::process_ipo_listings(session, &self.config, dice));

        // 6. Soft decay.
        if session.wealth < STRESS_WEALTH_THRESHOLD {
            session.happiness -= 2;
            lines.push("Financial stress is affecting your happiness (-2).".to_string());
        }
        if session.happiness > HEDONIC_THRESHOLD {
            session.happiness -= 1;
        }
        session.clamp_stats(&self.config);

        // 7. Game over, then character triggers on survival.
        let reason = self.check_game_over(session);
        let chatbot = match reason {
            None => self.evaluate_character_triggers(conn, session, dice)?,
            Some(reason) => {
                lines.push(format!("GAME OVER: {}", reason));
                None
            }
        };
        if let Some(message) = &chatbot {
            lines.push(format!(
                "{}: {}",
                message.character.to_string().to_uppercase(),
                message.message
            ));
        }

        Ok(MonthAdvance { report: lines.join(" "), game_over_reason: reason, chatbot })
    }

    // ================= GAME OVER =================

    fn check_game_over(&self, session: &GameSession) -> Option<EndReason> {
        if session.wealth <= 0 {
            return Some(EndReason::Bankruptcy);
        }
        if session.happiness <= self.config.min_happiness {
            return Some(EndReason::Burnout);
        }
        if session.current_month > self.config.game_duration_months {
            return Some(EndReason::Completed);
        }
        None
    }

    /// Freezes the session: renders the final report, writes the history
    /// row, and folds the result into the player profile. All inside the
    /// caller's transaction.
    fn finalize(
        &self,
        conn: &Connection,
        session: &mut GameSession,
        reason: EndReason,
    ) -> Result<()> {
        if !session.is_active {
            return Ok(());
        }
        session.is_active = false;

        let (portfolio_value, breakdown) = portfolio_breakdown(session);
        if session.final_report.is_none() {
            let report = match self.providers.report_renderer.render(
                session,
                reason,
                portfolio_value,
                &breakdown,
            ) {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => render_template(session, reason, portfolio_value, &breakdown),
                Err(e) => {
                    warn!("report renderer failed: {}; using template", e);
                    render_template(session, reason, portfolio_value, &breakdown)
                }
            };
            session.final_report = Some(report);
        }

        let persona = persona_for(session);
        let mut history = GameHistory {
            id: 0,
            user_id: session.user_id,
            final_wealth: session.wealth,
            final_happiness: session.happiness,
            final_credit_score: session.credit_score,
            financial_literacy_score: session.financial_literacy,
            persona: persona.persona.clone(),
            end_reason: reason,
            months_played: session.current_month,
            played_at: Utc::now(),
        };
        store::insert_game_history(conn, &mut history)?;

        let mut profile = store::load_profile(conn, session.user_id)?
            .unwrap_or_else(|| PlayerProfile::new(session.user_id));
        profile.record_game(
            session.wealth,
            portfolio_value,
            session.financial_literacy,
            session.credit_score,
            session.happiness,
        );
        store::upsert_profile(conn, &profile)?;

        session.append_log(&format!("GAME OVER: {} ({})", reason, persona.persona));
        info!("session {} finalised: {} as {}", session.id, reason, persona.persona);
        Ok(())
    }

    // ================= CONTEXTUAL CHARACTERS =================

    /// Evaluates the character triggers in priority order after a surviving
    /// month advance. Returns at most one message.
    fn evaluate_character_triggers(
        &self,
        conn: &Connection,
        session: &GameSession,
        dice: &mut dyn Dice,
    ) -> Result<Option<ChatbotMessage>> {
        let advisor = &self.providers.advisor;

        // 1. Vasooli: debt crisis.
        let total_debt_emi: i64 = store::active_expenses(conn, session.id)?
            .iter()
            .filter(|e| e.category == ExpenseCategory::Debt)
            .map(|e| e.amount)
            .sum();
        if total_debt_emi > 0 {
            let net_worth = session.net_worth();
            let debt_ratio = total_debt_emi as f64 / net_worth.max(1) as f64;
            if total_debt_emi as f64 > 0.4 * session.wealth as f64 || debt_ratio > 0.5 {
                return Ok(Some(advisor.character_message(
                    CharacterId::Vasooli,
                    &format!(
                        "Debt EMI is \u{20B9}{}/mo against a net worth of \u{20B9}{}",
                        total_debt_emi, net_worth
                    ),
                    session.wealth,
                    0,
                )));
            }
        }

        // 2. Sundar: random scam offer.
        if session.wealth > SCAM_MIN_WEALTH && dice.chance(SCAM_PROBABILITY) {
            let scam_amount = (session.wealth / 5).clamp(5_000, 25_000);
            return Ok(Some(advisor.character_message(
                CharacterId::Sundar,
                &format!("Player has \u{20B9}{} cash", session.wealth),
                session.wealth,
                scam_amount,
            )));
        }

        // 3. Harshad: idle cash.
        if session.wealth > IDLE_CASH_THRESHOLD && session.portfolio_is_empty() {
            return Ok(Some(advisor.character_message(
                CharacterId::Harshad,
                &format!("\u{20B9}{} sitting idle with zero portfolio", session.wealth),
                session.wealth,
                0,
            )));
        }

        // 4. Jetta: business profile or sustained losses.
        let profile = store::load_profile(conn, session.user_id)?;
        let is_business =
            profile.and_then(|p| p.career_stage) == Some(CareerStage::BusinessOwner);
        let start = self.config.starting_wealth.max(1);
        let drop_pct = (start - session.wealth) as f64 / start as f64;
        if is_business || drop_pct > 0.10 {
            let reason = if is_business {
                "Business owner profile: Jetta Bhai watches your margins".to_string()
            } else {
                format!("Wealth dropped {:.0}% from the start", drop_pct * 100.0)
            };
            return Ok(Some(advisor.character_message(
                CharacterId::Jetta,
                &reason,
                session.wealth,
                0,
            )));
        }

        Ok(None)
    }

    /// Resolves the player's answer to Sundar's scam offer.
    pub fn process_scam_choice(
        &self,
        user_id: i64,
        session_id: i64,
        accepted: bool,
        amount: i64,
    ) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;

            if accepted {
                if amount <= 0 {
                    return Err(GameError::Validation("Scam amount must be positive.".to_string()));
                }
                session.wealth -= amount;
                session.happiness -= 15;
                session.financial_literacy -= 5;
                session.clamp_stats(&self.config);
                session.append_log(&format!(
                    "Month {}: fell for a scam! Lost \u{20B9}{} to Sundar's scheme.",
                    session.current_month, amount
                ));

                let reason = self.check_game_over(&session);
                let mut final_persona = None;
                if let Some(reason) = reason {
                    self.finalize(conn, &mut session, reason)?;
                    final_persona = Some(persona_for(&session));
                }
                store::update_session(conn, &session)?;
                Ok(TurnOutcome {
                    message: format!(
                        "SCAM ALERT! Sundar vanished with your \u{20B9}{}. If it's too good to be true, it is.",
                        amount
                    ),
                    month_advanced: false,
                    game_over: reason.is_some(),
                    game_over_reason: reason,
                    final_persona,
                    chatbot: None,
                    session,
                })
            } else {
                session.financial_literacy += 5;
                session.append_log(&format!(
                    "Month {}: ignored Sundar's scam. Smart move.",
                    session.current_month
                ));
                store::update_session(conn, &session)?;
                Ok(TurnOutcome::simple(
                    session,
                    "Smart move! You avoided a scam. Guaranteed high returns are guaranteed fraud."
                        .to_string(),
                ))
            }
        })
    }

    // ================= LOANS =================

    pub fn take_loan(
        &self,
        user_id: i64,
        session_id: i64,
        loan_type: LoanType,
    ) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;
            session.refresh_level(&self.config);

            if session.current_level < self.config.level_unlocks.loans {
                return Err(GameError::Gated(format!(
                    "Loans unlock at Level {}.",
                    self.config.level_unlocks.loans
                )));
            }

            let message = match loan_type {
                LoanType::Family => {
                    let amount = 5_000;
                    if session.wealth + amount > 50_000 {
                        return Err(GameError::Validation(
                            "You don't need a loan right now.".to_string(),
                        ));
                    }
                    session.wealth += amount;
                    session.happiness -= 5;
                    "Family helped with \u{20B9}5,000. Pay them back later!".to_string()
                }
                LoanType::InstantApp => {
                    let amount = 10_000;
                    let credit_limit = session.credit_score * 30;
                    if amount > credit_limit {
                        return Err(GameError::Gated(format!(
                            "Loan rejected. Your credit limit is \u{20B9}{}.",
                            credit_limit
                        )));
                    }
                    session.wealth += amount;
                    session.credit_score -= 50;
                    session.happiness += 5;

                    let mut emi = RecurringExpense::new(
                        session.id,
                        "High Interest Loan",
                        500,
                        ExpenseCategory::Debt,
                        true,
                        0.0,
                        session.current_month,
                    );
                    store::insert_expense(conn, &mut emi)?;
                    format!(
                        "Loan approved: \u{20B9}{}. Credit score dropped. Monthly interest added.",
                        amount
                    )
                }
            };
            session.clamp_stats(&self.config);
            session.append_log(&format!(
                "Month {}: took a {} loan.",
                session.current_month, loan_type
            ));
            store::update_session(conn, &session)?;
            Ok(TurnOutcome::simple(session, message))
        })
    }

    // ================= TRADING =================

    pub fn buy_stock(
        &self,
        user_id: i64,
        session_id: i64,
        sector: Sector,
        amount: i64,
    ) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;
            session.refresh_level(&self.config);

            if session.current_level < self.config.level_unlocks.investing {
                return Err(GameError::Gated(format!(
                    "Investing unlocks at Level {}.",
                    self.config.level_unlocks.investing
                )));
            }
            if session.current_level < self.config.level_unlocks.diversification
                && session.holds_other_sector(sector)
            {
                return Err(GameError::Gated(format!(
                    "Diversification unlocks at Level {}. Stick to one sector for now.",
                    self.config.level_unlocks.diversification
                )));
            }
            if amount <= 0 {
                return Err(GameError::Validation("Amount must be positive.".to_string()));
            }
            if amount > session.wealth {
                return Err(GameError::InsufficientFunds {
                    required: amount,
                    available: session.wealth,
                });
            }

            let price = session.stock_price(sector);
            let units = amount as f64 / price as f64;
            session.wealth -= amount;
            *session.portfolio.entry(sector).or_insert(0.0) += units;
            session.purchase_history.push(TradeRecord {
                sector,
                units,
                price,
                month: session.current_month,
            });

            session.append_log(&format!(
                "Month {}: bought {:.2} units of {} at \u{20B9}{}.",
                session.current_month,
                units,
                sector.label(),
                price
            ));
            store::update_session(conn, &session)?;
            Ok(TurnOutcome::simple(
                session,
                format!("Bought {:.2} units of {} at \u{20B9}{}.", units, sector.label(), price),
            ))
        })
    }

    pub fn sell_stock(
        &self,
        user_id: i64,
        session_id: i64,
        sector: Sector,
        units: f64,
    ) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;

            if units <= 0.0 || !units.is_finite() {
                return Err(GameError::Validation("Invalid units.".to_string()));
            }
            let owned = session.units_held(sector);
            if units > owned {
                return Err(GameError::InsufficientUnits { requested: units, available: owned });
            }

            let price = session.stock_price(sector);
            let cash_value = (units * price as f64) as i64;
            session.wealth += cash_value;
            session.portfolio.insert(sector, owned - units);

            session.append_log(&format!(
                "Month {}: sold {:.2} units of {} for \u{20B9}{}.",
                session.current_month,
                units,
                sector.label(),
                cash_value
            ));
            store::update_session(conn, &session)?;
            Ok(TurnOutcome::simple(
                session,
                format!("Sold {:.2} units for \u{20B9}{}.", units, cash_value),
            ))
        })
    }

    pub fn buy_mutual_fund(
        &self,
        user_id: i64,
        session_id: i64,
        fund: FundKey,
        amount: i64,
    ) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;
            session.refresh_level(&self.config);

            if session.current_level < self.config.level_unlocks.investing {
                return Err(GameError::Gated(format!(
                    "Investing unlocks at Level {}. (Mutual Funds)",
                    self.config.level_unlocks.investing
                )));
            }
            let spec = self
                .config
                .fund(fund)
                .ok_or_else(|| GameError::Validation("Invalid fund type.".to_string()))?;
            if amount < 500 {
                return Err(GameError::Validation(
                    "Minimum investment is \u{20B9}500.".to_string(),
                ));
            }
            if amount > session.wealth {
                return Err(GameError::InsufficientFunds {
                    required: amount,
                    available: session.wealth,
                });
            }

            let nav = session.fund_nav(fund);
            let units = amount as f64 / nav;
            let holding = session.mutual_funds.entry(fund).or_default();
            holding.units += units;
            holding.invested += amount;
            session.wealth -= amount;

            session.append_log(&format!(
                "Month {}: invested \u{20B9}{} in {}.",
                session.current_month, amount, spec.name
            ));
            let message = format!("Invested \u{20B9}{} in {}.", amount, spec.name);
            store::update_session(conn, &session)?;
            Ok(TurnOutcome::simple(session, message))
        })
    }

    pub fn sell_mutual_fund(
        &self,
        user_id: i64,
        session_id: i64,
        fund: FundKey,
        units: f64,
    ) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;

            let holding = session
                .mutual_funds
                .get(&fund)
                .copied()
                .ok_or_else(|| GameError::NotFound("You don't own this fund.".to_string()))?;
            if units <= 0.0 || !units.is_finite() {
                return Err(GameError::Validation("Invalid units.".to_string()));
            }
            if units > holding.units {
                return Err(GameError::InsufficientUnits {
                    requested: units,
                    available: holding.units,
                });
            }

            let nav = session.fund_nav(fund);
            let redemption = (units * nav) as i64;
            session.wealth += redemption;

            let remaining = holding.units - units;
            if remaining < 0.01 {
                // Dust cleanup: drop the position entirely.
                session.mutual_funds.remove(&fund);
            } else {
                let invested =
                    (holding.invested as f64 * (remaining / holding.units)).round() as i64;
                session.mutual_funds.insert(fund, FundHolding { units: remaining, invested });
            }

            session.append_log(&format!(
                "Month {}: redeemed {:.2} fund units for \u{20B9}{}.",
                session.current_month, units, redemption
            ));
            store::update_session(conn, &session)?;
            Ok(TurnOutcome::simple(
                session,
                format!("Redeemed {:.2} units for \u{20B9}{}.", units, redemption),
            ))
        })
    }

    pub fn sell_futures(
        &self,
        user_id: i64,
        session_id: i64,
        sector: Sector,
        units: f64,
        duration_months: u32,
    ) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;
            session.refresh_level(&self.config);

            if session.current_level < self.config.level_unlocks.mastery {
                return Err(GameError::Gated(format!(
                    "Futures unlock at Level {}.",
                    self.config.level_unlocks.mastery
                )));
            }
            if units <= 0.0 || !units.is_finite() {
                return Err(GameError::Validation("Invalid units.".to_string()));
            }
            if duration_months == 0 {
                return Err(GameError::Validation(
                    "Duration must be at least one month.".to_string(),
                ));
            }
            let owned = session.units_held(sector);
            if units > owned {
                return Err(GameError::InsufficientUnits { requested: units, available: owned });
            }

            let spot = session.stock_price(sector);
            let contract_price = futures_quote(spot, duration_months);
            let payout = (contract_price as f64 * units) as i64;

            session.wealth += payout;
            session.portfolio.insert(sector, owned - units);

            let mut contract = FuturesContract {
                id: 0,
                session_id: session.id,
                sector,
                units,
                strike_price: contract_price,
                spot_price_at_sale: spot,
                duration_months,
                created_month: session.current_month,
            };
            store::insert_futures_contract(conn, &mut contract)?;

            session.append_log(&format!(
                "Month {}: sold {:.2} {} futures at \u{20B9}{}/unit.",
                session.current_month,
                units,
                sector.label(),
                contract_price
            ));
            store::update_session(conn, &session)?;
            Ok(TurnOutcome::simple(
                session,
                format!(
                    "Contract sold! {:.2} {} units @ \u{20B9}{}/unit. +\u{20B9}{}",
                    units,
                    sector.label(),
                    contract_price,
                    payout
                ),
            ))
        })
    }

    pub fn apply_for_ipo(
        &self,
        user_id: i64,
        session_id: i64,
        ipo_name: &str,
        amount: i64,
    ) -> Result<TurnOutcome> {
        self.locked(session_id, |conn, _dice| {
            let mut session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            self.ensure_active(&session)?;

            let listing = self
                .config
                .ipo_by_name(ipo_name)
                .ok_or_else(|| GameError::NotFound("Invalid IPO.".to_string()))?;
            if session.current_month > listing.month {
                return Err(GameError::Validation("IPO closed.".to_string()));
            }
            if session.current_month < listing.month {
                return Err(GameError::Validation(format!(
                    "IPO opens in month {}.",
                    listing.month
                )));
            }
            if !(10_000..=200_000).contains(&amount) {
                return Err(GameError::Validation(
                    "Investment must be between \u{20B9}10,000 and \u{20B9}2,00,000.".to_string(),
                ));
            }
            if amount > session.wealth {
                return Err(GameError::InsufficientFunds {
                    required: amount,
                    available: session.wealth,
                });
            }
            if session.active_ipos.iter().any(|a| a.name == listing.name) {
                return Err(GameError::DuplicateApplication(listing.name.clone()));
            }

            session.wealth -= amount;
            session.active_ipos.push(IpoApplication {
                name: listing.name.clone(),
                amount,
                status: IpoStatus::Applied,
                month: session.current_month,
            });

            session.append_log(&format!(
                "Month {}: applied for the {} IPO (\u{20B9}{}).",
                session.current_month, listing.name, amount
            ));
            let message =
                format!("Applied for {} IPO (\u{20B9}{}). Allocation next month.", listing.name, amount);
            store::update_session(conn, &session)?;
            Ok(TurnOutcome::simple(session, message))
        })
    }

    // ================= QUERIES =================

    pub fn get_market_status(&self, user_id: i64, session_id: i64) -> Result<MarketStatus> {
        self.locked(session_id, |conn, _dice| {
            let session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            Ok(MarketStatus {
                current_month: session.current_month,
                portfolio_value: session.portfolio_value(),
                open_ipo: self.config.ipo_for_month(session.current_month).cloned(),
                stock_prices: session.stock_prices.clone(),
                market_trends: session.market_trends.clone(),
                fund_navs: session.fund_navs.clone(),
                portfolio: session.portfolio.clone(),
                mutual_funds: session.mutual_funds.clone(),
                active_ipos: session.active_ipos,
            })
        })
    }

    /// The final Markdown report, optionally translated.
    pub fn get_final_report(
        &self,
        user_id: i64,
        session_id: i64,
        target_lang: Option<&str>,
    ) -> Result<Option<String>> {
        self.locked(session_id, |conn, _dice| {
            let session = store::load_session(conn, session_id)?;
            self.check_owner(&session, user_id)?;
            let Some(report) = session.final_report else {
                return Ok(None);
            };
            let report = match target_lang {
                None => report,
                Some(lang) => match self.providers.translator.translate(&report, lang) {
                    Ok(translated) => translated,
                    Err(e) => {
                        warn!("translation to {} failed: {}; returning original", lang, e);
                        report
                    }
                },
            };
            Ok(Some(report))
        })
    }
}
