//! Recurring monthly expenses.
//!
//! Every session starts with four default bills (rent, groceries, utilities,
//! transport); scenario choices and loans add or cancel further expenses.
//! Expenses are never deleted: cancellation flips a flag and records the
//! month, so the play log keeps the full budget history.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Budget category of a recurring expense.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Housing,
    Food,
    Utilities,
    Transport,
    Lifestyle,
    Debt,
}

/// A recurring monthly drain on wealth, owned by one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub id: i64,
    pub session_id: i64,
    pub name: String,
    pub amount: i64,
    pub category: ExpenseCategory,
    pub is_essential: bool,
    /// Annual inflation applied every 12 months; 0.0 for fixed amounts.
    pub inflation_rate: f64,
    pub started_month: u32,
    pub is_cancelled: bool,
    pub cancelled_month: Option<u32>,
}

impl RecurringExpense {
    pub fn new(
        session_id: i64,
        name: &str,
        amount: i64,
        category: ExpenseCategory,
        is_essential: bool,
        inflation_rate: f64,
        started_month: u32,
    ) -> Self {
        Self {
            id: 0,
            session_id,
            name: name.to_string(),
            amount,
            category,
            is_essential,
            inflation_rate,
            started_month,
            is_cancelled: false,
            cancelled_month: None,
        }
    }

    /// Applies one annual inflation tick. Returns `(old, new)` when the
    /// amount changed.
    pub fn apply_inflation(&mut self) -> Option<(i64, i64)> {
        if self.inflation_rate <= 0.0 {
            return None;
        }
        let old = self.amount;
        self.amount = (old as f64 * (1.0 + self.inflation_rate)) as i64;
        Some((old, self.amount))
    }

    /// Cancels the expense. Idempotent: cancelling twice keeps the original
    /// cancellation month. Returns whether the state changed.
    pub fn cancel(&mut self, month: u32) -> bool {
        if self.is_cancelled {
            return false;
        }
        self.is_cancelled = true;
        self.cancelled_month = Some(month);
        true
    }
}

/// The four bills every new session starts with.
pub fn default_expenses(session_id: i64, started_month: u32) -> Vec<RecurringExpense> {
    vec![
        RecurringExpense::new(
            session_id,
            "Rent (2BHK)",
            10_000,
            ExpenseCategory::Housing,
            true,
            0.05,
            started_month,
        ),
        RecurringExpense::new(
            session_id,
            "Groceries",
            2_500,
            ExpenseCategory::Food,
            true,
            0.07,
            started_month,
        ),
        RecurringExpense::new(
            session_id,
            "Utilities (Electricity/Water)",
            1_000,
            ExpenseCategory::Utilities,
            true,
            0.03,
            started_month,
        ),
        RecurringExpense::new(
            session_id,
            "Transport (Metro/Bus)",
            1_000,
            ExpenseCategory::Transport,
            true,
            0.05,
            started_month,
        ),
    ]
}
