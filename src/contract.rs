//! Futures contracts.
//!
//! Selling futures cashes the seller out immediately at a discounted quote;
//! the contract row is recorded for history but never settled by the core.
//! The discount grows with contract duration, giving the house its edge.

use crate::market::Sector;
use serde::{Deserialize, Serialize};

/// Base risk discount applied to every futures quote.
const BASE_RISK_DISCOUNT: f64 = 0.05;

/// Additional discount per month of contract duration.
const MONTHLY_RISK_DISCOUNT: f64 = 0.01;

/// An executed futures sale. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuturesContract {
    pub id: i64,
    pub session_id: i64,
    pub sector: Sector,
    pub units: f64,
    /// Per-unit price the seller was paid.
    pub strike_price: i64,
    /// Spot price at the moment of sale.
    pub spot_price_at_sale: i64,
    pub duration_months: u32,
    pub created_month: u32,
}

/// Per-unit quote for a futures sale: spot price less the duration-scaled
/// risk discount.
pub fn futures_quote(spot_price: i64, duration_months: u32) -> i64 {
    let discount = BASE_RISK_DISCOUNT + MONTHLY_RISK_DISCOUNT * duration_months as f64;
    (spot_price as f64 * (1.0 - discount)) as i64
}
