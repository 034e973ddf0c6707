//! Market simulation: sectors, mutual-fund NAVs, price trajectories, and
//! the monthly price roll.
//!
//! Each session owns a pre-generated 60-month price trajectory per sector
//! (seeded from the forecast provider when cold-start data exists, otherwise
//! geometric Brownian motion). The monthly roll adopts the pre-generated
//! price for the new month; scenario cards can additionally fire an
//! intra-month shock that multiplies sector prices immediately and flips the
//! momentum trend.
//!
//! Fund NAVs are not pre-generated: they take a gaussian step each month
//! with a catalogue-defined volatility, floored at [`NAV_FLOOR`].

use crate::card::MarketEvent;
use crate::config::GameConfig;
use crate::dice::Dice;
use crate::session::{GameSession, IpoStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// Stock sectors tradeable in the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    #[strum(serialize = "gold")]
    Gold,
    #[strum(serialize = "tech")]
    Tech,
    #[strum(serialize = "real_estate")]
    RealEstate,
}

impl Sector {
    pub const ALL: [Sector; 3] = [Sector::Gold, Sector::Tech, Sector::RealEstate];

    /// Human-readable label for news lines and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Sector::Gold => "Gold",
            Sector::Tech => "Tech",
            Sector::RealEstate => "Real Estate",
        }
    }
}

/// Mutual-fund catalogue keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
pub enum FundKey {
    #[serde(rename = "NIFTY50")]
    #[strum(serialize = "NIFTY50")]
    Nifty50,
    #[serde(rename = "MIDCAP")]
    #[strum(serialize = "MIDCAP")]
    MidCap,
    #[serde(rename = "SMALLCAP")]
    #[strum(serialize = "SMALLCAP")]
    SmallCap,
}

impl FundKey {
    pub const ALL: [FundKey; 3] = [FundKey::Nifty50, FundKey::MidCap, FundKey::SmallCap];
}

/// NAV floor after a monthly fund step.
pub const NAV_FLOOR: f64 = 10.0;

/// Mean monthly fund NAV drift (~10% annual).
pub const NAV_DRIFT: f64 = 0.008;

/// Starting NAV for every fund.
pub const NAV_START: f64 = 100.0;

/// Absolute percentage move that makes a sector headline the news feed.
const NEWS_THRESHOLD_PCT: f64 = 5.0;

/// Momentum assigned to a sector hit by an event shock.
const SHOCK_TREND: i32 = 3;

/// Generates a geometric-Brownian-motion price trajectory.
///
/// Each step multiplies the price by `1 + N(drift, volatility)`. Prices are
/// truncated to whole rupees and floored at 1 so a deep drawdown can never
/// produce a non-positive price.
pub fn gbm_trajectory(
    start_price: f64,
    drift: f64,
    volatility: f64,
    months: u32,
    dice: &mut dyn Dice,
) -> Vec<i64> {
    let mut prices = Vec::with_capacity(months as usize);
    let mut current = start_price;
    for _ in 0..months {
        current *= 1.0 + dice.gauss(drift, volatility);
        prices.push((current as i64).max(1));
    }
    prices
}

/// Adopts the pre-generated prices for the session's current month and steps
/// every fund NAV. Returns news lines for significant moves.
pub fn roll_monthly_prices(
    session: &mut GameSession,
    config: &GameConfig,
    month_prices: &BTreeMap<Sector, i64>,
    dice: &mut dyn Dice,
) -> Vec<String> {
    let mut changes = Vec::new();

    for (&sector, &new_price) in month_prices {
        let old_price = session.stock_prices.get(&sector).copied().unwrap_or(0);
        session.stock_prices.insert(sector, new_price);

        if old_price > 0 {
            let pct = (new_price - old_price) as f64 / old_price as f64 * 100.0;
            if pct.abs() > NEWS_THRESHOLD_PCT {
                let direction = if pct > 0.0 { "surged" } else { "tanked" };
                changes.push(format!("{} {} {:.1}%", sector.label(), direction, pct.abs()));
            }
        }
    }

    for fund in &config.mutual_funds {
        let old_nav = session.fund_nav(fund.key);
        let change_pct = dice.gauss(NAV_DRIFT, fund.volatility);
        let new_nav = (old_nav * (1.0 + change_pct)).max(NAV_FLOOR);
        session.fund_navs.insert(fund.key, new_nav);

        // Funds only make headlines on a big drawdown.
        if change_pct < -0.05 {
            changes.push(format!("{} dropped {:.1}%", fund.name, change_pct.abs() * 100.0));
        }
    }

    changes
}

/// Applies an intra-month market shock from a scenario card's event.
///
/// Multiplies each listed sector's price immediately and sets the momentum
/// trend to ±3 depending on the direction. Returns news lines.
pub fn apply_event_shock(session: &mut GameSession, event: &MarketEvent) -> Vec<String> {
    let mut changes = Vec::new();

    for (&sector, &multiplier) in &event.sector_impacts {
        let Some(&old_price) = session.stock_prices.get(&sector) else {
            continue;
        };
        let new_price = ((old_price as f64) * multiplier) as i64;
        session.stock_prices.insert(sector, new_price.max(1));

        let trend = if multiplier > 1.0 { SHOCK_TREND } else { -SHOCK_TREND };
        session.market_trends.insert(sector, trend);

        let pct = ((multiplier - 1.0) * 100.0) as i64;
        if pct != 0 {
            let direction = if pct > 0 { "surged" } else { "crashed" };
            changes.push(format!("{} {} {}%", sector.label(), direction, pct.abs()));
        }
    }

    changes
}

/// Resolves every APPLIED IPO whose application month has passed.
///
/// Samples an allotment ratio from {0.0, 0.5, 1.0} and a listing move:
/// a gain in U(0.10, 0.80) with the scheduled probability, otherwise a loss
/// in U(-0.30, -0.05). Refund plus listed value is credited to wealth and
/// the application is marked processed.
pub fn process_ipo_listings(
    session: &mut GameSession,
    config: &GameConfig,
    dice: &mut dyn Dice,
) -> Vec<String> {
    let current_month = session.current_month;
    let mut lines = Vec::new();
    let mut credits: i64 = 0;

    for ipo in &mut session.active_ipos {
        if ipo.status != IpoStatus::Applied || ipo.month >= current_month {
            continue;
        }

        let gain_prob = config
            .ipo_by_name(&ipo.name)
            .map(|listing| listing.listing_gain_prob)
            .unwrap_or(0.5);

        let listing_move = if dice.chance(gain_prob) {
            dice.uniform(0.10, 0.80)
        } else {
            dice.uniform(-0.30, -0.05)
        };

        const ALLOTMENT_RATIOS: [f64; 3] = [0.0, 0.5, 1.0];
        let ratio = ALLOTMENT_RATIOS[dice.index(ALLOTMENT_RATIOS.len())];

        let invested = ipo.amount as f64;
        let allotted_value = invested * ratio;
        let refund = invested - allotted_value;
        let listed_value = allotted_value * (1.0 + listing_move);
        let total_credit = (refund + listed_value) as i64;
        let profit = total_credit - ipo.amount;

        credits += total_credit;
        ipo.status = IpoStatus::Processed;

        let status_msg = if ratio == 0.0 {
            "No allotment (refunded).".to_string()
        } else if profit > 0 {
            format!("Listed with gains! Profit: \u{20B9}{}", profit)
        } else {
            format!("Discount listing. Loss: \u{20B9}{}", profit.abs())
        };
        lines.push(format!("IPO {}: {}", ipo.name, status_msg));
    }

    session.wealth += credits;
    lines
}
