//! Game tuning constants.
//!
//! [`GameConfig`] is an immutable value object carrying every knob of the
//! simulation: starting stats, clamp bounds, the level ladder, per-level
//! card filters, feature unlocks, the mutual-fund catalogue, the IPO
//! schedule, and the per-sector GBM parameters for synthetic price
//! trajectories. Defaults match the production game; individual fields can
//! be overridden from a YAML or TOML file.

use crate::error::{GameError, Result};
use crate::market::{FundKey, Sector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One rung of the level ladder. A session reaches the level once *either*
/// gate is met.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelThreshold {
    pub level: u8,
    pub min_month: u32,
    pub min_literacy: i64,
    pub desc: String,
}

/// Per-level scenario-card filter: a difficulty cap and an optional category
/// allow-list (`None` = all categories).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelCardFilter {
    pub level: u8,
    pub max_difficulty: u8,
    pub categories: Option<Vec<crate::card::CardCategory>>,
}

/// Level at which each gated feature unlocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelUnlocks {
    pub loans: u8,
    pub investing: u8,
    pub diversification: u8,
    pub mastery: u8,
}

/// Risk band of a mutual fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

/// One fund in the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundSpec {
    pub key: FundKey,
    pub name: String,
    pub risk: RiskBand,
    /// Monthly NAV volatility (standard deviation of the gaussian step).
    pub volatility: f64,
}

/// One scheduled IPO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpoListing {
    /// The single month in which applications are open.
    pub month: u32,
    pub name: String,
    pub price_band: i64,
    pub listing_gain_prob: f64,
}

/// Per-sector GBM parameters for synthetic trajectories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorParams {
    pub sector: Sector,
    pub drift: f64,
    pub volatility: f64,
    pub start_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub starting_wealth: i64,
    pub happiness_start: i64,
    pub credit_score_start: i64,
    pub start_month: u32,
    pub cards_per_month: u32,
    pub game_duration_months: u32,
    pub min_happiness: i64,
    pub max_happiness: i64,
    pub min_credit: i64,
    pub max_credit: i64,
    pub monthly_salary: i64,
    pub starting_lifelines: i64,

    /// Probability of consulting the scenario generator for a fresh card.
    pub ai_card_probability: f64,

    /// Minimum number of daily seed ticks required before the forecast
    /// provider is consulted for the tech trajectory.
    pub min_seed_ticks: usize,

    /// Ticker whose seed ticks drive the tech-sector forecast.
    pub primary_ticker: String,

    pub level_thresholds: Vec<LevelThreshold>,
    pub level_card_filters: Vec<LevelCardFilter>,
    pub level_unlocks: LevelUnlocks,
    pub mutual_funds: Vec<FundSpec>,
    pub ipo_schedule: Vec<IpoListing>,
    pub sector_params: Vec<SectorParams>,
}

impl Default for GameConfig {
    fn default() -> Self {
        use crate::card::CardCategory::*;
        Self {
            starting_wealth: 25_000,
            happiness_start: 100,
            credit_score_start: 700,
            start_month: 1,
            cards_per_month: 3,
            game_duration_months: 60,
            min_happiness: 0,
            max_happiness: 100,
            min_credit: 300,
            max_credit: 900,
            monthly_salary: 25_000,
            starting_lifelines: 3,
            ai_card_probability: 0.3,
            min_seed_ticks: 60,
            primary_ticker: "RELIANCE.NS".to_string(),
            level_thresholds: vec![
                LevelThreshold { level: 1, min_month: 1, min_literacy: 0, desc: "The Basics".into() },
                LevelThreshold { level: 2, min_month: 6, min_literacy: 20, desc: "Credit & Debt".into() },
                LevelThreshold { level: 3, min_month: 12, min_literacy: 45, desc: "Investing".into() },
                LevelThreshold { level: 4, min_month: 24, min_literacy: 70, desc: "Diversification".into() },
                LevelThreshold { level: 5, min_month: 36, min_literacy: 90, desc: "Mastery".into() },
            ],
            level_card_filters: vec![
                LevelCardFilter {
                    level: 1,
                    max_difficulty: 2,
                    categories: Some(vec![Needs, Wants, Emergency, Social]),
                },
                LevelCardFilter {
                    level: 2,
                    max_difficulty: 3,
                    categories: Some(vec![Needs, Wants, Emergency, Social, Debt, Shopping]),
                },
                LevelCardFilter {
                    level: 3,
                    max_difficulty: 4,
                    categories: Some(vec![Needs, Wants, Emergency, Social, Investment, News]),
                },
                LevelCardFilter {
                    level: 4,
                    max_difficulty: 5,
                    categories: Some(vec![
                        Needs, Wants, Emergency, Social, Investment, News, Quiz, Trap,
                    ]),
                },
                LevelCardFilter { level: 5, max_difficulty: 5, categories: None },
            ],
            level_unlocks: LevelUnlocks {
                loans: 2,
                investing: 3,
                diversification: 4,
                mastery: 5,
            },
            mutual_funds: vec![
                FundSpec {
                    key: FundKey::Nifty50,
                    name: "Nifty 50 Index Fund".into(),
                    risk: RiskBand::Low,
                    volatility: 0.03,
                },
                FundSpec {
                    key: FundKey::MidCap,
                    name: "MidCap Opportunities".into(),
                    risk: RiskBand::Medium,
                    volatility: 0.06,
                },
                FundSpec {
                    key: FundKey::SmallCap,
                    name: "SmallCap Discovery".into(),
                    risk: RiskBand::High,
                    volatility: 0.10,
                },
            ],
            ipo_schedule: vec![
                IpoListing { month: 6, name: "Zomato".into(), price_band: 76, listing_gain_prob: 0.7 },
                IpoListing { month: 12, name: "LIC".into(), price_band: 900, listing_gain_prob: 0.4 },
                IpoListing { month: 18, name: "Paytm".into(), price_band: 2150, listing_gain_prob: 0.1 },
                IpoListing { month: 24, name: "Tata Tech".into(), price_band: 500, listing_gain_prob: 0.9 },
            ],
            sector_params: vec![
                SectorParams { sector: Sector::Tech, drift: 0.02, volatility: 0.15, start_price: 500.0 },
                SectorParams { sector: Sector::Gold, drift: 0.005, volatility: 0.05, start_price: 1800.0 },
                SectorParams {
                    sector: Sector::RealEstate,
                    drift: 0.01,
                    volatility: 0.02,
                    start_price: 300.0,
                },
            ],
        }
    }
}

impl GameConfig {
    /// Loads a configuration from a YAML or TOML file. Missing fields fall
    /// back to the defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| GameError::Validation(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: GameConfig = match extension {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| GameError::Validation(format!("Invalid YAML config: {}", e)))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| GameError::Validation(format!("Invalid TOML config: {}", e)))?,
            other => {
                return Err(GameError::Validation(format!(
                    "Unsupported config format: '{}'. Use .yaml, .yml, or .toml",
                    other
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Sanity-checks the tuning values.
    pub fn validate(&self) -> Result<()> {
        if self.cards_per_month == 0 {
            return Err(GameError::Validation("cards_per_month must be positive".into()));
        }
        if self.game_duration_months == 0 {
            return Err(GameError::Validation("game_duration_months must be positive".into()));
        }
        if self.min_happiness > self.max_happiness || self.min_credit > self.max_credit {
            return Err(GameError::Validation("clamp bounds are inverted".into()));
        }
        if !(0.0..=1.0).contains(&self.ai_card_probability) {
            return Err(GameError::Validation("ai_card_probability must be in [0, 1]".into()));
        }
        if self.level_thresholds.is_empty() || self.level_card_filters.is_empty() {
            return Err(GameError::Validation("level tables must not be empty".into()));
        }
        for params in &self.sector_params {
            if params.start_price <= 0.0 || params.volatility < 0.0 {
                return Err(GameError::Validation(format!(
                    "invalid GBM parameters for sector {}",
                    params.sector
                )));
            }
        }
        Ok(())
    }

    /// Derives the capability level for a month/literacy pair. The highest
    /// threshold whose month *or* literacy gate is met wins.
    pub fn level_for(&self, current_month: u32, financial_literacy: i64) -> u8 {
        let mut level = 1;
        for threshold in &self.level_thresholds {
            if current_month >= threshold.min_month || financial_literacy >= threshold.min_literacy
            {
                level = threshold.level;
            }
        }
        level
    }

    /// Card filter for a level, falling back to level 1 for out-of-range
    /// values.
    pub fn filter_for_level(&self, level: u8) -> &LevelCardFilter {
        self.level_card_filters
            .iter()
            .find(|f| f.level == level)
            .unwrap_or(&self.level_card_filters[0])
    }

    pub fn fund(&self, key: FundKey) -> Option<&FundSpec> {
        self.mutual_funds.iter().find(|f| f.key == key)
    }

    pub fn ipo_by_name(&self, name: &str) -> Option<&IpoListing> {
        self.ipo_schedule.iter().find(|i| i.name == name)
    }

    pub fn ipo_for_month(&self, month: u32) -> Option<&IpoListing> {
        self.ipo_schedule.iter().find(|i| i.month == month)
    }

    pub fn sector_params(&self, sector: Sector) -> Option<&SectorParams> {
        self.sector_params.iter().find(|p| p.sector == sector)
    }
}
