//! Scenario cards, their choices, and attached market events.
//!
//! Cards are read-only reference data at runtime: the engine draws them from
//! the built-in deck (or from the scenario generator) and never mutates
//! them. A card presents a situation; each choice carries the four stat
//! impacts, optional recurring-expense side effects, and feedback text.

use crate::market::Sector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// Category of a scenario card. Gated per level by the config card filters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CardCategory {
    Needs,
    Wants,
    Emergency,
    Investment,
    Social,
    Debt,
    Shopping,
    News,
    Quiz,
    Trap,
}

/// A market shock attached to a NEWS-style card. Fires immediately when a
/// choice on the card is submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEvent {
    pub title: String,
    pub description: String,
    /// Multiplier per affected sector, e.g. `{tech: 1.25, gold: 0.95}`.
    pub sector_impacts: BTreeMap<Sector, f64>,
    pub is_active: bool,
}

/// One selectable option on a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub text: String,
    pub wealth_impact: i64,
    pub happiness_impact: i64,
    pub credit_impact: i64,
    pub literacy_impact: i64,
    pub feedback: String,
    pub is_recommended: bool,
    /// When positive, submitting this choice installs a recurring expense of
    /// this monthly amount.
    pub adds_recurring_expense: i64,
    pub expense_name: Option<String>,
    /// When set, submitting this choice cancels all active expenses with
    /// this name.
    pub cancels_expense_name: Option<String>,
}

impl Choice {
    /// A neutral choice with no impacts; builder-style setters below fill in
    /// the interesting fields.
    pub fn new(id: i64, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
            wealth_impact: 0,
            happiness_impact: 0,
            credit_impact: 0,
            literacy_impact: 0,
            feedback: String::new(),
            is_recommended: false,
            adds_recurring_expense: 0,
            expense_name: None,
            cancels_expense_name: None,
        }
    }

    pub fn impacts(mut self, wealth: i64, happiness: i64, credit: i64, literacy: i64) -> Self {
        self.wealth_impact = wealth;
        self.happiness_impact = happiness;
        self.credit_impact = credit;
        self.literacy_impact = literacy;
        self
    }

    pub fn feedback(mut self, text: &str) -> Self {
        self.feedback = text.to_string();
        self
    }

    pub fn recommended(mut self) -> Self {
        self.is_recommended = true;
        self
    }

    pub fn adds_expense(mut self, name: &str, amount: i64) -> Self {
        self.adds_recurring_expense = amount;
        self.expense_name = Some(name.to_string());
        self
    }

    pub fn cancels_expense(mut self, name: &str) -> Self {
        self.cancels_expense_name = Some(name.to_string());
        self
    }
}

/// A scenario card: reference data describing one situation and its choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCard {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: CardCategory,
    /// Difficulty 1..=5; capped per level by the config card filters.
    pub difficulty: u8,
    /// Earliest month this card may appear.
    pub min_month: u32,
    pub is_active: bool,
    /// True for cards produced by the scenario generator rather than the
    /// built-in deck.
    pub is_generated: bool,
    pub market_event: Option<MarketEvent>,
    pub choices: Vec<Choice>,
}

impl ScenarioCard {
    pub fn choice(&self, choice_id: i64) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }

    /// The choice a lifeline reveals: among recommended choices the one with
    /// the highest happiness impact; when nothing is flagged, the overall
    /// highest happiness impact.
    pub fn recommended_choice(&self) -> Option<&Choice> {
        let recommended = self
            .choices
            .iter()
            .filter(|c| c.is_recommended)
            .max_by_key(|c| c.happiness_impact);
        recommended.or_else(|| self.choices.iter().max_by_key(|c| c.happiness_impact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_with_choices(choices: Vec<Choice>) -> ScenarioCard {
        ScenarioCard {
            id: 1,
            title: "Test".into(),
            description: String::new(),
            category: CardCategory::Wants,
            difficulty: 1,
            min_month: 1,
            is_active: true,
            is_generated: false,
            market_event: None,
            choices,
        }
    }

    #[test]
    fn test_category_string_round_trip() {
        use std::str::FromStr;
        assert_eq!(CardCategory::Emergency.to_string(), "EMERGENCY");
        assert_eq!(CardCategory::from_str("NEEDS").unwrap(), CardCategory::Needs);
    }

    #[test]
    fn test_choice_lookup() {
        let card = card_with_choices(vec![Choice::new(10, "a"), Choice::new(11, "b")]);
        assert_eq!(card.choice(11).unwrap().text, "b");
        assert!(card.choice(12).is_none());
    }

    #[test]
    fn test_recommended_choice_prefers_flagged() {
        let card = card_with_choices(vec![
            Choice::new(10, "a").impacts(0, 50, 0, 0),
            Choice::new(11, "b").impacts(0, 1, 0, 0).recommended(),
        ]);
        assert_eq!(card.recommended_choice().unwrap().id, 11);
    }

    #[test]
    fn test_recommended_choice_tie_breaks_on_happiness() {
        let card = card_with_choices(vec![
            Choice::new(10, "a").impacts(0, 2, 0, 0).recommended(),
            Choice::new(11, "b").impacts(0, 9, 0, 0).recommended(),
        ]);
        assert_eq!(card.recommended_choice().unwrap().id, 11);
    }

    #[test]
    fn test_recommended_choice_falls_back_to_happiest() {
        let card = card_with_choices(vec![
            Choice::new(10, "a").impacts(0, -5, 0, 0),
            Choice::new(11, "b").impacts(0, 3, 0, 0),
        ]);
        assert_eq!(card.recommended_choice().unwrap().id, 11);
    }
}
