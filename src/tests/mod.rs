//! Integration-level tests for the engine.
//!
//! Unit tests live in `#[cfg(test)]` modules next to the code they cover;
//! the modules here exercise whole engine flows: turns, month advancement,
//! trading, the literal boundary scenarios, and property-based invariants.

mod engine_tests;
pub mod test_helpers;
mod trading_tests;
