//! Income sources and their monthly payouts.
//!
//! A session with no explicit income sources falls back to the flat monthly
//! salary constant. Freelance income is stochastic: a 30% chance of no gig,
//! otherwise 80-120% of the base amount.

use crate::dice::Dice;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomeType {
    Salary,
    Freelance,
    Rental,
}

impl IncomeType {
    pub fn label(&self) -> &'static str {
        match self {
            IncomeType::Salary => "Salary",
            IncomeType::Freelance => "Freelance",
            IncomeType::Rental => "Rental Income",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    #[default]
    Monthly,
}

/// A recurring income stream owned by one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeSource {
    pub id: i64,
    pub session_id: i64,
    pub source_type: IncomeType,
    pub amount_base: i64,
    pub frequency: Frequency,
}

/// Probability that a freelance month yields no gig.
const FREELANCE_DRY_PROB: f64 = 0.3;

impl IncomeSource {
    pub fn new(session_id: i64, source_type: IncomeType, amount_base: i64) -> Self {
        Self { id: 0, session_id, source_type, amount_base, frequency: Frequency::Monthly }
    }

    /// Computes this month's payout. Salary and rental pay the base amount;
    /// freelance is stochastic.
    pub fn monthly_payout(&self, dice: &mut dyn Dice) -> i64 {
        match self.source_type {
            IncomeType::Salary | IncomeType::Rental => self.amount_base,
            IncomeType::Freelance => {
                if dice.chance(FREELANCE_DRY_PROB) {
                    0
                } else {
                    (self.amount_base as f64 * dice.uniform(0.8, 1.2)) as i64
                }
            }
        }
    }
}
