//! Test helpers: an engine builder over an in-memory store, card factories,
//! and direct session surgery for setting up mid-game states.

use crate::card::{CardCategory, Choice, ScenarioCard};
use crate::config::GameConfig;
use crate::dice::{Dice, ScriptedDice, SeededDice};
use crate::engine::GameEngine;
use crate::providers::Providers;
use crate::session::GameSession;
use crate::store::{self, SessionStore};

/// The user id every test session belongs to.
pub const USER: i64 = 1;

/// Builder for a test engine over an in-memory store.
///
/// Defaults: default config, built-in deck, default providers, and a
/// [`ScriptedDice`] with an empty script (every draw sees 0.5, which keeps
/// gaussian steps at their mean and low-probability triggers off).
pub struct TestEngineBuilder {
    config: GameConfig,
    deck: Option<Vec<ScenarioCard>>,
    dice: Option<Box<dyn Dice>>,
    providers: Providers,
}

pub fn test_engine() -> TestEngineBuilder {
    TestEngineBuilder {
        config: GameConfig::default(),
        deck: None,
        dice: None,
        providers: Providers::default(),
    }
}

impl TestEngineBuilder {
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn deck(mut self, deck: Vec<ScenarioCard>) -> Self {
        self.deck = Some(deck);
        self
    }

    /// Scripted randomness; values are consumed in order, then 0.5 forever.
    pub fn scripted(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.dice = Some(Box::new(ScriptedDice::new(values)));
        self
    }

    /// Scripted randomness that starts *after* session creation: the GBM
    /// trajectory draws (one gaussian per sector per month) are padded with
    /// midpoint values so `values` lines up with the first post-creation
    /// draw.
    pub fn scripted_after_session(self, values: impl IntoIterator<Item = f64>) -> Self {
        let trajectory_draws =
            (self.config.game_duration_months as usize) * self.config.sector_params.len();
        let mut script = vec![0.5; trajectory_draws];
        script.extend(values);
        self.scripted(script)
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.dice = Some(Box::new(SeededDice::new(seed)));
        self
    }

    pub fn providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    pub fn build(self) -> GameEngine {
        let store = SessionStore::open_in_memory().expect("in-memory store");
        let dice = self.dice.unwrap_or_else(|| Box::new(ScriptedDice::new([])));
        match self.deck {
            Some(deck) => GameEngine::with_deck(store, self.config, self.providers, dice, deck),
            None => GameEngine::new(store, self.config, self.providers, dice),
        }
    }
}

/// A single-choice card with the given impacts.
pub fn impact_card(
    id: i64,
    category: CardCategory,
    wealth: i64,
    happiness: i64,
    credit: i64,
    literacy: i64,
) -> ScenarioCard {
    ScenarioCard {
        id,
        title: format!("Card {}", id),
        description: String::new(),
        category,
        difficulty: 1,
        min_month: 1,
        is_active: true,
        is_generated: false,
        market_event: None,
        choices: vec![Choice::new(id * 100 + 1, "Only option")
            .impacts(wealth, happiness, credit, literacy)],
    }
}

/// A deck of one neutral card, enough for any game length thanks to the
/// repeat fallback in selection.
pub fn neutral_deck() -> Vec<ScenarioCard> {
    vec![impact_card(1, CardCategory::Wants, 0, 0, 0, 0)]
}

/// Loads the session fresh from the store.
pub fn load(engine: &GameEngine, session_id: i64) -> GameSession {
    engine
        .store()
        .with_transaction(|conn| store::load_session(conn, session_id))
        .expect("load session")
}

/// Applies `f` to the stored session and persists the result.
pub fn modify_session<F>(engine: &GameEngine, session_id: i64, f: F)
where
    F: FnOnce(&mut GameSession),
{
    engine
        .store()
        .with_transaction(|conn| {
            let mut session = store::load_session(conn, session_id)?;
            f(&mut session);
            store::update_session(conn, &session)
        })
        .expect("modify session");
}

/// Submits the first (and only) choice of the given card.
pub fn play(engine: &GameEngine, session_id: i64, card: &ScenarioCard) -> crate::engine::TurnOutcome {
    engine
        .submit_choice(USER, session_id, card.id, card.choices[0].id)
        .expect("submit choice")
}

/// Replays the default-expense inflation rule: returns total bills paid
/// over month advances 2..=last_month, with the annual tick applied before
/// the bills of every month m where m > 1 and m % 12 == 1.
pub fn expected_default_bills(last_month: u32) -> i64 {
    let mut amounts: Vec<(i64, f64)> =
        vec![(10_000, 0.05), (2_500, 0.07), (1_000, 0.03), (1_000, 0.05)];
    let mut total = 0;
    for month in 2..=last_month {
        if month > 1 && month % 12 == 1 {
            for (amount, rate) in amounts.iter_mut() {
                *amount = (*amount as f64 * (1.0 + *rate)) as i64;
            }
        }
        total += amounts.iter().map(|(amount, _)| *amount).sum::<i64>();
    }
    total
}
