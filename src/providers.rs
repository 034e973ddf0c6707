//! Contracts for the external collaborators.
//!
//! The engine consults four optional services: a scenario generator, a
//! final-report renderer, a price forecaster, and a translator (the advisor
//! has its own module). Every contract has a bounded failure mode: the
//! engine swallows any [`ProviderError`] with a log line and falls back to
//! deterministic behaviour, so a collaborator outage can never fail a game
//! operation.
//!
//! The shipped implementations are the deterministic stubs; LLM-backed
//! implementations plug in through [`Providers`] at engine construction.

use crate::advisor::{Advisor, CuratedAdvisor};
use crate::card::{CardCategory, ScenarioCard};
use crate::history::PlayerProfile;
use crate::session::{EndReason, GameSession};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

/// Failure of an external collaborator. Never surfaces to engine callers.
#[derive(Debug, Clone)]
pub struct ProviderError(pub String);

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider error: {}", self.0)
    }
}

impl StdError for ProviderError {}

/// One daily market tick used to seed the forecast model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTick {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub rsi: f64,
    pub macd: f64,
    pub signal: f64,
    pub daily_return: f64,
}

/// Generates fresh scenario cards tailored to the player.
pub trait ScenarioGenerator: Send + Sync {
    /// Returns a new card, or `Ok(None)` when generation is declined.
    fn generate(
        &self,
        profile: Option<&PlayerProfile>,
        wealth: i64,
        month: u32,
        category: CardCategory,
    ) -> Result<Option<ScenarioCard>, ProviderError>;
}

/// Stub generator: always declines, pushing selection to the built-in deck.
pub struct DisabledScenarioGenerator;

impl ScenarioGenerator for DisabledScenarioGenerator {
    fn generate(
        &self,
        _profile: Option<&PlayerProfile>,
        _wealth: i64,
        _month: u32,
        _category: CardCategory,
    ) -> Result<Option<ScenarioCard>, ProviderError> {
        Ok(None)
    }
}

/// Renders the final Markdown report.
pub trait ReportRenderer: Send + Sync {
    fn render(
        &self,
        session: &GameSession,
        reason: EndReason,
        portfolio_value: i64,
        portfolio_breakdown: &str,
    ) -> Result<String, ProviderError>;
}

/// Stub renderer: always errors so the engine uses the deterministic
/// template.
pub struct NoReportRenderer;

impl ReportRenderer for NoReportRenderer {
    fn render(
        &self,
        _session: &GameSession,
        _reason: EndReason,
        _portfolio_value: i64,
        _portfolio_breakdown: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError("report renderer not configured".to_string()))
    }
}

/// Produces a monthly price trajectory from daily seed ticks.
pub trait ForecastProvider: Send + Sync {
    fn forecast(&self, seed: &[SeedTick], months: u32) -> Result<Vec<i64>, ProviderError>;
}

/// Stub forecaster: always errors so trajectories fall back to GBM.
pub struct NoForecast;

impl ForecastProvider for NoForecast {
    fn forecast(&self, _seed: &[SeedTick], _months: u32) -> Result<Vec<i64>, ProviderError> {
        Err(ProviderError("forecast model not available".to_string()))
    }
}

/// Offline batch translation.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, ProviderError>;
}

/// Stub translator: returns the text unchanged.
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, text: &str, _target_lang: &str) -> Result<String, ProviderError> {
        Ok(text.to_string())
    }
}

/// Resolves an external identity to a stable user id.
pub trait Auth: Send + Sync {
    fn resolve(&self, identity: &str) -> Result<i64, ProviderError>;
}

/// In-memory identity table for CLI and test use.
#[derive(Default)]
pub struct StaticAuth {
    users: HashMap<String, i64>,
}

impl StaticAuth {
    pub fn new(users: impl IntoIterator<Item = (String, i64)>) -> Self {
        Self { users: users.into_iter().collect() }
    }

    pub fn single(identity: &str, user_id: i64) -> Self {
        Self::new([(identity.to_string(), user_id)])
    }
}

impl Auth for StaticAuth {
    fn resolve(&self, identity: &str) -> Result<i64, ProviderError> {
        self.users
            .get(identity)
            .copied()
            .ok_or_else(|| ProviderError(format!("unknown identity '{}'", identity)))
    }
}

/// The collaborator bundle injected into the engine.
pub struct Providers {
    pub advisor: Box<dyn Advisor>,
    pub scenario_generator: Box<dyn ScenarioGenerator>,
    pub report_renderer: Box<dyn ReportRenderer>,
    pub forecast: Box<dyn ForecastProvider>,
    pub translator: Box<dyn Translator>,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            advisor: Box::new(CuratedAdvisor),
            scenario_generator: Box::new(DisabledScenarioGenerator),
            report_renderer: Box::new(NoReportRenderer),
            forecast: Box::new(NoForecast),
            translator: Box::new(IdentityTranslator),
        }
    }
}
