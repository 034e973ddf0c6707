//! Trading verbs: stocks, mutual funds, futures, IPO applications, loans.

use super::test_helpers::{load, modify_session, neutral_deck, test_engine, USER};
use crate::engine::LoanType;
use crate::expense::ExpenseCategory;
use crate::market::{FundKey, Sector};
use crate::store;

fn engine_at_level(literacy: i64) -> (crate::engine::GameEngine, i64) {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();
    modify_session(&engine, session.id, |s| s.financial_literacy = literacy);
    (engine, session.id)
}

// ================= STOCKS =================

#[test]
fn test_buy_stock_gated_below_investing_level() {
    let (engine, session_id) = engine_at_level(0);
    let err = engine.buy_stock(USER, session_id, Sector::Tech, 1_000).unwrap_err();
    assert_eq!(err.code(), "gated");
}

#[test]
fn test_buy_stock_debits_and_credits_units() {
    let (engine, session_id) = engine_at_level(45); // level 3
    let price = load(&engine, session_id).stock_price(Sector::Tech);

    let outcome = engine.buy_stock(USER, session_id, Sector::Tech, 1_000).unwrap();
    assert_eq!(outcome.session.wealth, 24_000);
    let units = outcome.session.portfolio[&Sector::Tech];
    assert!((units - 1_000.0 / price as f64).abs() < 1e-9);

    // The trade lands in purchase history.
    assert_eq!(outcome.session.purchase_history.len(), 1);
    let record = &outcome.session.purchase_history[0];
    assert_eq!(record.price, price);
    assert_eq!(record.month, 1);
}

#[test]
fn test_buy_stock_validations() {
    let (engine, session_id) = engine_at_level(45);

    let err = engine.buy_stock(USER, session_id, Sector::Tech, 0).unwrap_err();
    assert_eq!(err.code(), "validation");
    let err = engine.buy_stock(USER, session_id, Sector::Tech, 30_000).unwrap_err();
    assert_eq!(err.code(), "insufficient_funds");
}

#[test]
fn test_diversification_gate_blocks_second_sector() {
    let (engine, session_id) = engine_at_level(45); // level 3
    engine.buy_stock(USER, session_id, Sector::Tech, 1_000).unwrap();

    let err = engine.buy_stock(USER, session_id, Sector::Gold, 1_000).unwrap_err();
    assert_eq!(err.code(), "gated");

    // Topping up the same sector stays legal.
    engine.buy_stock(USER, session_id, Sector::Tech, 500).unwrap();

    // Level 4 (literacy 70) unlocks diversification.
    modify_session(&engine, session_id, |s| s.financial_literacy = 70);
    engine.buy_stock(USER, session_id, Sector::Gold, 1_000).unwrap();
}

#[test]
fn test_buy_then_sell_round_trips_within_a_rupee() {
    let (engine, session_id) = engine_at_level(45);
    let wealth_before = load(&engine, session_id).wealth;

    let bought = engine.buy_stock(USER, session_id, Sector::Gold, 1_000).unwrap();
    let units = bought.session.portfolio[&Sector::Gold];
    let sold = engine.sell_stock(USER, session_id, Sector::Gold, units).unwrap();

    assert!((sold.session.wealth - wealth_before).abs() <= 1);
    assert!(sold.session.portfolio[&Sector::Gold].abs() < 1e-9);
}

#[test]
fn test_sell_stock_validations() {
    let (engine, session_id) = engine_at_level(45);
    engine.buy_stock(USER, session_id, Sector::Tech, 1_000).unwrap();
    let units = load(&engine, session_id).portfolio[&Sector::Tech];

    let err = engine.sell_stock(USER, session_id, Sector::Tech, units * 2.0).unwrap_err();
    assert_eq!(err.code(), "insufficient_units");
    let err = engine.sell_stock(USER, session_id, Sector::Tech, 0.0).unwrap_err();
    assert_eq!(err.code(), "validation");
    let err = engine.sell_stock(USER, session_id, Sector::Gold, 1.0).unwrap_err();
    assert_eq!(err.code(), "insufficient_units");
}

// ================= MUTUAL FUNDS =================

#[test]
fn test_fund_buy_gated_and_validated() {
    let (engine, session_id) = engine_at_level(0);
    let err = engine.buy_mutual_fund(USER, session_id, FundKey::Nifty50, 1_000).unwrap_err();
    assert_eq!(err.code(), "gated");

    let (engine, session_id) = engine_at_level(45);
    let err = engine.buy_mutual_fund(USER, session_id, FundKey::Nifty50, 400).unwrap_err();
    assert_eq!(err.code(), "validation");
    let err = engine.buy_mutual_fund(USER, session_id, FundKey::Nifty50, 30_000).unwrap_err();
    assert_eq!(err.code(), "insufficient_funds");
}

#[test]
fn test_fund_buy_merges_holdings() {
    let (engine, session_id) = engine_at_level(45);

    engine.buy_mutual_fund(USER, session_id, FundKey::Nifty50, 1_000).unwrap();
    let outcome = engine.buy_mutual_fund(USER, session_id, FundKey::Nifty50, 500).unwrap();

    let holding = outcome.session.mutual_funds[&FundKey::Nifty50];
    // NAV starts at 100: 10 + 5 units.
    assert!((holding.units - 15.0).abs() < 1e-9);
    assert_eq!(holding.invested, 1_500);
    assert_eq!(outcome.session.wealth, 23_500);
}

#[test]
fn test_fund_sell_prorates_invested_and_cleans_dust() {
    let (engine, session_id) = engine_at_level(45);
    engine.buy_mutual_fund(USER, session_id, FundKey::MidCap, 1_000).unwrap();

    // Sell half: invested halves too.
    let outcome = engine.sell_mutual_fund(USER, session_id, FundKey::MidCap, 5.0).unwrap();
    let holding = outcome.session.mutual_funds[&FundKey::MidCap];
    assert!((holding.units - 5.0).abs() < 1e-9);
    assert_eq!(holding.invested, 500);
    assert_eq!(outcome.session.wealth, 24_500);

    // Sell the rest: the key disappears entirely.
    let outcome = engine.sell_mutual_fund(USER, session_id, FundKey::MidCap, 5.0).unwrap();
    assert!(!outcome.session.mutual_funds.contains_key(&FundKey::MidCap));
    assert_eq!(outcome.session.wealth, 25_000);
}

#[test]
fn test_fund_sell_validations() {
    let (engine, session_id) = engine_at_level(45);
    let err = engine.sell_mutual_fund(USER, session_id, FundKey::SmallCap, 1.0).unwrap_err();
    assert_eq!(err.code(), "not_found");

    engine.buy_mutual_fund(USER, session_id, FundKey::SmallCap, 1_000).unwrap();
    let err = engine.sell_mutual_fund(USER, session_id, FundKey::SmallCap, 50.0).unwrap_err();
    assert_eq!(err.code(), "insufficient_units");
}

// ================= FUTURES =================

#[test]
fn test_futures_gated_below_mastery() {
    let (engine, session_id) = engine_at_level(70); // level 4
    let err = engine.sell_futures(USER, session_id, Sector::Tech, 1.0, 3).unwrap_err();
    assert_eq!(err.code(), "gated");
}

#[test]
fn test_futures_sale_pays_discounted_quote() {
    let (engine, session_id) = engine_at_level(90); // level 5
    engine.buy_stock(USER, session_id, Sector::Tech, 2_000).unwrap();
    let before = load(&engine, session_id);
    let spot = before.stock_price(Sector::Tech);
    let owned = before.portfolio[&Sector::Tech];

    let outcome = engine.sell_futures(USER, session_id, Sector::Tech, owned, 3).unwrap();
    // 3-month contract: 8% discount off spot.
    let quote = (spot as f64 * 0.92) as i64;
    assert_eq!(outcome.session.wealth, before.wealth + (quote as f64 * owned) as i64);
    assert!(outcome.session.portfolio[&Sector::Tech].abs() < 1e-9);

    engine
        .store()
        .with_transaction(|conn| {
            let contracts = store::futures_contracts(conn, session_id)?;
            assert_eq!(contracts.len(), 1);
            assert_eq!(contracts[0].strike_price, quote);
            assert_eq!(contracts[0].spot_price_at_sale, spot);
            assert_eq!(contracts[0].duration_months, 3);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_futures_validations() {
    let (engine, session_id) = engine_at_level(90);
    let err = engine.sell_futures(USER, session_id, Sector::Tech, 1.0, 3).unwrap_err();
    assert_eq!(err.code(), "insufficient_units");
    let err = engine.sell_futures(USER, session_id, Sector::Tech, 0.0, 3).unwrap_err();
    assert_eq!(err.code(), "validation");
    let err = engine.sell_futures(USER, session_id, Sector::Tech, 1.0, 0).unwrap_err();
    assert_eq!(err.code(), "validation");
}

// ================= IPOS =================

#[test]
fn test_ipo_application_window() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();

    // Month 1: Zomato (month 6) is not open yet.
    let err = engine.apply_for_ipo(USER, session.id, "Zomato", 20_000).unwrap_err();
    assert_eq!(err.code(), "validation");

    modify_session(&engine, session.id, |s| s.current_month = 7);
    let err = engine.apply_for_ipo(USER, session.id, "Zomato", 20_000).unwrap_err();
    assert_eq!(err.code(), "validation");

    let err = engine.apply_for_ipo(USER, session.id, "NotAnIpo", 20_000).unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[test]
fn test_ipo_application_amount_bounds() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();
    modify_session(&engine, session.id, |s| s.current_month = 6);

    let err = engine.apply_for_ipo(USER, session.id, "Zomato", 9_999).unwrap_err();
    assert_eq!(err.code(), "validation");
    let err = engine.apply_for_ipo(USER, session.id, "Zomato", 200_001).unwrap_err();
    assert_eq!(err.code(), "validation");
    let err = engine.apply_for_ipo(USER, session.id, "Zomato", 30_000).unwrap_err();
    assert_eq!(err.code(), "insufficient_funds");
}

#[test]
fn test_ipo_duplicate_application_refused() {
    let engine = test_engine().deck(neutral_deck()).build();
    let session = engine.start_new_session(USER).unwrap();
    modify_session(&engine, session.id, |s| s.current_month = 6);

    let outcome = engine.apply_for_ipo(USER, session.id, "Zomato", 10_000).unwrap();
    assert_eq!(outcome.session.wealth, 15_000);
    assert_eq!(outcome.session.active_ipos.len(), 1);

    let err = engine.apply_for_ipo(USER, session.id, "Zomato", 10_000).unwrap_err();
    assert_eq!(err.code(), "duplicate_application");
}

// ================= LOANS =================

#[test]
fn test_loans_gated_below_level_two() {
    let (engine, session_id) = engine_at_level(0);
    let err = engine.take_loan(USER, session_id, LoanType::Family).unwrap_err();
    assert_eq!(err.code(), "gated");
}

#[test]
fn test_family_loan_and_anti_exploit() {
    let (engine, session_id) = engine_at_level(20); // level 2

    // Wealthy players are refused.
    modify_session(&engine, session_id, |s| s.wealth = 46_000);
    let err = engine.take_loan(USER, session_id, LoanType::Family).unwrap_err();
    assert_eq!(err.code(), "validation");

    modify_session(&engine, session_id, |s| s.wealth = 4_000);
    let outcome = engine.take_loan(USER, session_id, LoanType::Family).unwrap();
    assert_eq!(outcome.session.wealth, 9_000);
    assert_eq!(outcome.session.happiness, 95);
}

#[test]
fn test_instant_app_loan_installs_debt_expense() {
    let (engine, session_id) = engine_at_level(20);
    modify_session(&engine, session_id, |s| s.wealth = 2_000);

    let outcome = engine.take_loan(USER, session_id, LoanType::InstantApp).unwrap();
    assert_eq!(outcome.session.wealth, 12_000);
    assert_eq!(outcome.session.credit_score, 650);
    assert_eq!(outcome.session.happiness, 100); // +5 clamped at the cap

    engine
        .store()
        .with_transaction(|conn| {
            let emi = store::active_expenses(conn, session_id)?
                .into_iter()
                .find(|e| e.category == ExpenseCategory::Debt)
                .expect("debt expense installed");
            assert_eq!(emi.amount, 500);
            assert!(emi.is_essential);
            assert_eq!(emi.inflation_rate, 0.0);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_instant_app_loan_respects_credit_limit() {
    let (engine, session_id) = engine_at_level(20);
    // Limit is credit_score * 30; at 300 that is 9000, below the 10000 loan.
    modify_session(&engine, session_id, |s| {
        s.wealth = 2_000;
        s.credit_score = 300;
    });

    let err = engine.take_loan(USER, session_id, LoanType::InstantApp).unwrap_err();
    assert_eq!(err.code(), "gated");
    assert!(err.to_string().contains("9000"));
}

#[test]
fn test_trading_refused_on_finished_session() {
    let (engine, session_id) = engine_at_level(45);
    modify_session(&engine, session_id, |s| s.is_active = false);

    let err = engine.buy_stock(USER, session_id, Sector::Tech, 1_000).unwrap_err();
    assert_eq!(err.code(), "not_found");
    let err = engine.take_loan(USER, session_id, LoanType::Family).unwrap_err();
    assert_eq!(err.code(), "not_found");
}
