//! User-scoped aggregates: one row per finished game, plus a running
//! profile of personal bests.

use crate::session::EndReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Career stage on a player profile. Drives the Jetta character trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CareerStage {
    Student,
    Salaried,
    BusinessOwner,
}

/// One completed game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameHistory {
    pub id: i64,
    pub user_id: i64,
    pub final_wealth: i64,
    pub final_happiness: i64,
    pub final_credit_score: i64,
    pub financial_literacy_score: i64,
    pub persona: String,
    pub end_reason: EndReason,
    pub months_played: u32,
    pub played_at: DateTime<Utc>,
}

/// Per-user aggregates across all finished games.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub user_id: i64,
    pub total_games: i64,
    pub highest_wealth: i64,
    pub highest_score: i64,
    pub highest_credit_score: i64,
    pub highest_happiness: i64,
    pub highest_stock_profit: i64,
    pub career_stage: Option<CareerStage>,
}

impl PlayerProfile {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            total_games: 0,
            highest_wealth: 0,
            highest_score: 0,
            highest_credit_score: 0,
            highest_happiness: 0,
            highest_stock_profit: 0,
            career_stage: None,
        }
    }

    /// Folds a finished game into the aggregates.
    pub fn record_game(
        &mut self,
        final_wealth: i64,
        portfolio_value: i64,
        literacy: i64,
        credit_score: i64,
        happiness: i64,
    ) {
        self.total_games += 1;
        self.highest_wealth = self.highest_wealth.max(final_wealth + portfolio_value);
        self.highest_score = self.highest_score.max(literacy);
        self.highest_credit_score = self.highest_credit_score.max(credit_score);
        self.highest_happiness = self.highest_happiness.max(happiness);
        self.highest_stock_profit = self.highest_stock_profit.max(portfolio_value);
    }
}
