//! Engine flow tests: session creation, card dealing, choice submission,
//! lifelines, advice, and the scam flow.

use super::test_helpers::{impact_card, load, modify_session, neutral_deck, play, test_engine, USER};
use crate::card::{CardCategory, Choice, MarketEvent, ScenarioCard};
use crate::history::PlayerProfile;
use crate::market::Sector;
use crate::providers::{ProviderError, Providers, ScenarioGenerator};
use crate::store;
use std::collections::BTreeMap;

#[test]
fn test_start_new_session_seeds_everything() {
    let engine = test_engine().build();
    let session = engine.start_new_session(USER).unwrap();

    assert!(session.id > 0);
    assert_eq!(session.wealth, 25_000);
    assert_eq!(session.happiness, 100);
    assert_eq!(session.credit_score, 700);
    assert_eq!(session.lifelines, 3);
    assert_eq!(session.current_month, 1);
    assert!(session.is_active);
    assert_eq!(session.recurring_expenses, 14_500);

    // Every sector has a month-1 price and a full 60-month trajectory.
    for sector in Sector::ALL {
        assert!(session.stock_prices.contains_key(&sector));
        assert_eq!(session.market_trends[&sector], 0);
    }
    engine
        .store()
        .with_transaction(|conn| {
            assert_eq!(store::stock_history_count(conn, session.id)?, 180);
            assert_eq!(store::active_expenses(conn, session.id)?.len(), 4);
            let month1 = store::stock_prices_for_month(conn, session.id, 1)?;
            assert_eq!(month1.len(), 3);
            let month60 = store::stock_prices_for_month(conn, session.id, 60)?;
            assert_eq!(month60.len(), 3);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_ownership_is_enforced_on_every_verb() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();
    let stranger = 99;

    let err = engine.get_next_card(stranger, session.id).unwrap_err();
    assert_eq!(err.code(), "permission_denied");
    let err = engine.submit_choice(stranger, session.id, 1, 101).unwrap_err();
    assert_eq!(err.code(), "permission_denied");
    let err = engine.buy_stock(stranger, session.id, Sector::Tech, 100).unwrap_err();
    assert_eq!(err.code(), "permission_denied");
    let err = engine.get_market_status(stranger, session.id).unwrap_err();
    assert_eq!(err.code(), "permission_denied");
}

#[test]
fn test_get_next_card_respects_level_filters() {
    let engine = test_engine().seeded(11).build();
    let session = engine.start_new_session(USER).unwrap();
    let filter_categories =
        [CardCategory::Needs, CardCategory::Wants, CardCategory::Emergency, CardCategory::Social];

    for _ in 0..30 {
        let card = engine.get_next_card(USER, session.id).unwrap().unwrap();
        assert!(card.difficulty <= 2);
        assert!(filter_categories.contains(&card.category));
    }
}

#[test]
fn test_get_next_card_refuses_finished_session() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();
    modify_session(&engine, session.id, |s| s.is_active = false);

    let err = engine.get_next_card(USER, session.id).unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[test]
fn test_submit_choice_applies_and_clamps_impacts() {
    let deck = vec![impact_card(1, CardCategory::Wants, -2_000, 50, 300, 7)];
    let engine = test_engine().deck(deck.clone()).build();
    let session = engine.start_new_session(USER).unwrap();

    let outcome = play(&engine, session.id, &deck[0]);
    assert_eq!(outcome.session.wealth, 23_000);
    assert_eq!(outcome.session.happiness, 100); // clamped at the cap
    assert_eq!(outcome.session.credit_score, 900); // clamped at the cap
    assert_eq!(outcome.session.financial_literacy, 7);
    assert!(!outcome.game_over);
    assert!(!outcome.month_advanced);
}

#[test]
fn test_submit_choice_rejects_unknown_choice() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();

    let err = engine.submit_choice(USER, session.id, 1, 999).unwrap_err();
    assert_eq!(err.code(), "not_found");

    let err = engine.submit_choice(USER, session.id, 424242, 1).unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[test]
fn test_submit_choice_expense_side_effects() {
    let add = ScenarioCard {
        id: 1,
        title: "Gym".into(),
        description: String::new(),
        category: CardCategory::Wants,
        difficulty: 1,
        min_month: 1,
        is_active: true,
        is_generated: false,
        market_event: None,
        choices: vec![Choice::new(101, "Join the gym").adds_expense("Gym Membership", 1_500)],
    };
    let cancel = ScenarioCard {
        id: 2,
        title: "Budget cut".into(),
        description: String::new(),
        category: CardCategory::Wants,
        difficulty: 1,
        min_month: 1,
        is_active: true,
        is_generated: false,
        market_event: None,
        choices: vec![Choice::new(201, "Cancel the gym").cancels_expense("Gym Membership")],
    };
    let engine = test_engine().deck(vec![add.clone(), cancel.clone()]).build();
    let session = engine.start_new_session(USER).unwrap();

    play(&engine, session.id, &add);
    engine
        .store()
        .with_transaction(|conn| {
            let active = store::active_expenses(conn, session.id)?;
            assert_eq!(active.len(), 5);
            let gym = active.iter().find(|e| e.name == "Gym Membership").unwrap();
            assert_eq!(gym.amount, 1_500);
            assert!(!gym.is_essential);
            Ok(())
        })
        .unwrap();

    let outcome = play(&engine, session.id, &cancel);
    assert!(outcome.message.contains("Cancelled 1"));
    engine
        .store()
        .with_transaction(|conn| {
            assert_eq!(store::active_expenses(conn, session.id)?.len(), 4);
            Ok(())
        })
        .unwrap();

    // Cancelling again finds nothing to cancel.
    let outcome = play(&engine, session.id, &cancel);
    assert!(!outcome.message.contains("Cancelled"));
}

#[test]
fn test_submit_choice_fires_market_event() {
    let mut card = impact_card(1, CardCategory::News, 0, 0, 0, 0);
    card.market_event = Some(MarketEvent {
        title: "Crash".into(),
        description: String::new(),
        sector_impacts: BTreeMap::from([(Sector::Tech, 0.8)]),
        is_active: true,
    });
    let engine = test_engine().deck(vec![card.clone()]).build();
    let session = engine.start_new_session(USER).unwrap();
    let tech_before = load(&engine, session.id).stock_prices[&Sector::Tech];

    let outcome = play(&engine, session.id, &card);
    let tech_after = outcome.session.stock_prices[&Sector::Tech];
    assert_eq!(tech_after, (tech_before as f64 * 0.8) as i64);
    assert_eq!(outcome.session.market_trends[&Sector::Tech], -3);
    assert!(outcome.message.contains("MARKET NEWS"));
}

#[test]
fn test_three_cards_advance_the_month() {
    let deck = neutral_deck();
    let engine = test_engine().deck(deck.clone()).build();
    let session = engine.start_new_session(USER).unwrap();

    let first = play(&engine, session.id, &deck[0]);
    assert!(!first.month_advanced);
    let second = play(&engine, session.id, &deck[0]);
    assert!(!second.month_advanced);
    let third = play(&engine, session.id, &deck[0]);
    assert!(third.month_advanced);
    assert_eq!(third.session.current_month, 2);
    // Salary in, bills out.
    assert_eq!(third.session.wealth, 25_000 + 25_000 - 14_500);
    assert_eq!(third.session.recurring_expenses, 14_500);
}

#[test]
fn test_use_lifeline_reveals_and_decrements() {
    let card = ScenarioCard {
        id: 1,
        title: "Pick".into(),
        description: String::new(),
        category: CardCategory::Wants,
        difficulty: 1,
        min_month: 1,
        is_active: true,
        is_generated: false,
        market_event: None,
        choices: vec![
            Choice::new(101, "Bad idea").impacts(0, -5, 0, 0),
            Choice::new(102, "Good idea").impacts(0, 5, 0, 0).recommended(),
        ],
    };
    let engine = test_engine().deck(vec![card]).build();
    let session = engine.start_new_session(USER).unwrap();

    let hint = engine.use_lifeline(USER, session.id, 1).unwrap();
    assert_eq!(hint.choice_id, 102);
    assert!(hint.hint.contains("Good idea"));
    assert_eq!(hint.lifelines_remaining, 2);

    engine.use_lifeline(USER, session.id, 1).unwrap();
    engine.use_lifeline(USER, session.id, 1).unwrap();
    let err = engine.use_lifeline(USER, session.id, 1).unwrap_err();
    assert_eq!(err.code(), "validation");
}

#[test]
fn test_get_advice_uses_curated_catalogue() {
    let deck = vec![impact_card(1, CardCategory::Debt, 0, 0, 0, 0)];
    let mut card = deck[0].clone();
    card.title = "Loan against salary".to_string();
    let engine = test_engine().deck(vec![card]).build();
    let session = engine.start_new_session(USER).unwrap();

    let advice = engine.get_advice(USER, session.id, 1).unwrap();
    assert!(!advice.advice.is_empty());
}

#[test]
fn test_scam_decline_rewards_literacy() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();

    let outcome = engine.process_scam_choice(USER, session.id, false, 8_000).unwrap();
    assert_eq!(outcome.session.financial_literacy, 5);
    assert_eq!(outcome.session.wealth, 25_000);
    assert!(!outcome.game_over);
}

#[test]
fn test_scam_accept_costs_money_and_morale() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();

    let outcome = engine.process_scam_choice(USER, session.id, true, 8_000).unwrap();
    assert_eq!(outcome.session.wealth, 17_000);
    assert_eq!(outcome.session.happiness, 85);
    assert_eq!(outcome.session.financial_literacy, 0); // floored at zero
    assert!(!outcome.game_over);
}

#[test]
fn test_scam_accept_can_bankrupt() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();

    let outcome = engine.process_scam_choice(USER, session.id, true, 25_000).unwrap();
    assert!(outcome.game_over);
    assert_eq!(outcome.game_over_reason, Some(crate::session::EndReason::Bankruptcy));
    assert!(outcome.session.final_report.is_some());
}

/// Generator stub that always returns one fixed card.
struct FixedGenerator;

impl ScenarioGenerator for FixedGenerator {
    fn generate(
        &self,
        _profile: Option<&PlayerProfile>,
        _wealth: i64,
        _month: u32,
        category: CardCategory,
    ) -> Result<Option<ScenarioCard>, ProviderError> {
        let mut card = impact_card(5_000, category, 0, 3, 0, 2);
        card.is_generated = true;
        Ok(Some(card))
    }
}

#[test]
fn test_generated_cards_are_dealt_and_playable() {
    let providers = Providers {
        scenario_generator: Box::new(FixedGenerator),
        ..Providers::default()
    };
    // First post-creation draw 0.0 wins the AI roll; the next picks the
    // category.
    let engine = test_engine()
        .deck(neutral_deck())
        .providers(providers)
        .scripted_after_session([0.0, 0.0])
        .build();
    let session = engine.start_new_session(USER).unwrap();

    let card = engine.get_next_card(USER, session.id).unwrap().unwrap();
    assert!(card.is_generated);
    assert_eq!(card.id, 5_000);

    // The generated card resolves by id on submission.
    let outcome = engine.submit_choice(USER, session.id, card.id, card.choices[0].id).unwrap();
    assert_eq!(outcome.session.happiness, 100); // +3 clamped
    assert_eq!(outcome.session.financial_literacy, 2);
}

#[test]
fn test_market_status_snapshot() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();
    modify_session(&engine, session.id, |s| s.current_month = 6);

    let status = engine.get_market_status(USER, session.id).unwrap();
    assert_eq!(status.current_month, 6);
    assert_eq!(status.stock_prices.len(), 3);
    assert_eq!(status.fund_navs.len(), 3);
    assert_eq!(status.portfolio_value, 0);
    // Zomato opens in month 6.
    assert_eq!(status.open_ipo.unwrap().name, "Zomato");
}
