//! # Arth-Neeti Game Engine
//!
//! The server-side simulation kernel of Arth-Neeti, a turn-based
//! financial-literacy game. A player starts as a young professional with
//! ₹25,000 and plays through up to 60 monthly turns; each turn deals
//! scenario cards whose choices move cash, happiness, credit score and
//! financial literacy, install or cancel recurring bills, trade securities,
//! and occasionally shock the market. The engine advances time, pays
//! salary, deducts bills, rolls prices, and ends the game on bankruptcy,
//! burnout, or completion.
//!
//! ## Quick Start
//!
//! ```no_run
//! use arth_neeti::{
//!     dice::SeededDice, engine::GameEngine, config::GameConfig,
//!     providers::Providers, store::SessionStore,
//! };
//!
//! let store = SessionStore::open_in_memory().unwrap();
//! let engine = GameEngine::new(
//!     store,
//!     GameConfig::default(),
//!     Providers::default(),
//!     Box::new(SeededDice::new(42)),
//! );
//!
//! let session = engine.start_new_session(1).unwrap();
//! let card = engine.get_next_card(1, session.id).unwrap().unwrap();
//! let outcome = engine
//!     .submit_choice(1, session.id, card.id, card.choices[0].id)
//!     .unwrap();
//! println!("{}", outcome.message);
//! ```
//!
//! ## Core Concepts
//!
//! ### Sessions
//! A [`session::GameSession`] is one play-through: stats, market snapshot,
//! holdings, IPO applications, and the gameplay log. Child records
//! (expenses, stock history, futures contracts, income sources, play log)
//! live in their own tables, owned via the session id.
//!
//! ### Turns and months
//! Three cards make one month. When the play count crosses a month
//! boundary the month pipeline runs in a fixed order: income, bills and
//! inflation, market roll, IPO listings, soft decay, game-over check,
//! character triggers.
//!
//! ### Levels
//! A capability tier (1..=5) derived from the month and financial
//! literacy. Levels gate which cards are dealt and which trades are legal
//! (investing at 3, diversification at 4, futures at 5).
//!
//! ### External collaborators
//! The LLM advisor, scenario generator, report renderer, price forecaster
//! and translator are injected behind traits ([`providers`]) and each has
//! a deterministic fallback, so the engine works fully offline.
//!
//! ## Modules
//!
//! - [`advisor`] - curated advice catalogue and contextual characters
//! - [`card`] - scenario cards, choices, market events
//! - [`config`] - all game tuning constants
//! - [`contract`] - futures contracts and quoting
//! - [`deck`] - built-in fallback deck and card selection policy
//! - [`dice`] - injectable randomness seam
//! - [`engine`] - the simulation kernel and its verbs
//! - [`error`] - error taxonomy with stable machine codes
//! - [`expense`] - recurring expense lifecycle
//! - [`history`] - per-user game history and profile aggregates
//! - [`income`] - income sources and stochastic payouts
//! - [`market`] - sectors, GBM trajectories, monthly roll, IPO listing
//! - [`providers`] - external collaborator contracts and stubs
//! - [`report`] - persona rules and the final Markdown report
//! - [`session`] - the session aggregate
//! - [`store`] - SQLite state store

pub mod advisor;
pub mod card;
pub mod config;
pub mod contract;
pub mod deck;
pub mod dice;
pub mod engine;
pub mod error;
pub mod expense;
pub mod history;
pub mod income;
pub mod market;
pub mod providers;
pub mod report;
pub mod session;
pub mod store;

pub use advisor::{Advice, AdviceSource, Advisor, CharacterId, ChatbotMessage, CuratedAdvisor};
pub use card::{CardCategory, Choice, MarketEvent, ScenarioCard};
pub use config::{GameConfig, IpoListing, LevelCardFilter, LevelThreshold, LevelUnlocks};
pub use contract::FuturesContract;
pub use deck::builtin_deck;
pub use dice::{Dice, ScriptedDice, SeededDice};
pub use engine::{GameEngine, LifelineHint, LoanType, MarketStatus, TurnOutcome};
pub use error::{GameError, Result};
pub use expense::{ExpenseCategory, RecurringExpense};
pub use history::{CareerStage, GameHistory, PlayerProfile};
pub use income::{IncomeSource, IncomeType};
pub use market::{FundKey, Sector};
pub use providers::{
    Auth, ForecastProvider, ProviderError, Providers, ReportRenderer, ScenarioGenerator,
    SeedTick, StaticAuth, Translator,
};
pub use report::{persona_for, Persona};
pub use session::{EndReason, FundHolding, GameSession, IpoApplication, IpoStatus, TradeRecord};
pub use store::SessionStore;

#[cfg(test)]
mod tests;
