//! End-of-game persona and the deterministic final report.
//!
//! The persona is a rule tree over final wealth, happiness and literacy.
//! The Markdown report is the fallback behind the LLM report renderer and
//! always produces the same four sections: Summary, Highlights, Risks,
//! Recommendations.

use crate::session::{EndReason, GameSession};
use serde::{Deserialize, Serialize};

/// End-of-game label for the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub persona: String,
    pub description: String,
    pub final_score: i64,
    pub net_worth: i64,
}

/// Classifies the session into a persona. Rules are evaluated top-down;
/// the first match wins.
pub fn persona_for(session: &GameSession) -> Persona {
    let w = session.wealth;
    let h = session.happiness;
    let s = session.financial_literacy;

    let (persona, description) = if w > 100_000 && h > 80 {
        ("The Financial Guru", "Mastered wealth AND happiness.")
    } else if w > 100_000 && h < 40 {
        ("The Miser", "Rich but miserable.")
    } else if w < 10_000 && h > 80 {
        ("The Happy-Go-Lucky", "Broke but smiling.")
    } else if s >= 80 {
        ("The Warren Buffett", "Strategic genius.")
    } else if s >= 50 {
        ("The Balanced Spender", "Good balance.")
    } else {
        ("The FOMO Victim", "Driven by trends.")
    };

    Persona {
        persona: persona.to_string(),
        description: description.to_string(),
        final_score: s,
        net_worth: w,
    }
}

/// Marked-to-market portfolio value plus a one-line breakdown for reports.
pub fn portfolio_breakdown(session: &GameSession) -> (i64, String) {
    let mut lines = Vec::new();
    let mut total = 0;
    for (&sector, &units) in &session.portfolio {
        let price = session.stock_price(sector);
        let value = (units * price as f64) as i64;
        total += value;
        if units > 0.0 {
            lines.push(format!(
                "{}: {:.2} units @ \u{20B9}{} (\u{20B9}{})",
                sector.label(),
                units,
                price,
                value
            ));
        }
    }
    let breakdown = if lines.is_empty() {
        "No active holdings.".to_string()
    } else {
        lines.join("; ")
    };
    (total, breakdown)
}

/// The deterministic Markdown final report.
pub fn render_template(
    session: &GameSession,
    reason: EndReason,
    portfolio_value: i64,
    breakdown: &str,
) -> String {
    format!(
        "## Summary\n\
         - Outcome: **{reason}** after month **{month}**.\n\
         - Final cash: **\u{20B9}{wealth}**. Portfolio value: **\u{20B9}{portfolio_value}**.\n\
         - Happiness: **{happiness}**. Credit score: **{credit}**.\n\n\
         ## Highlights\n\
         - Portfolio: {breakdown}\n\
         - Recurring expenses: \u{20B9}{expenses}\n\n\
         ## Risks\n\
         - Watch cash flow relative to recurring bills.\n\
         - Keep credit score healthy by avoiding high-interest debt.\n\n\
         ## Recommendations\n\
         - Build a 3\u{2013}6 month emergency fund.\n\
         - Automate savings with a monthly SIP.\n\
         - Review recurring expenses and cancel low-value subscriptions.\n",
        reason = reason,
        month = session.current_month,
        wealth = session.wealth,
        portfolio_value = portfolio_value,
        happiness = session.happiness,
        credit = session.credit_score,
        breakdown = breakdown,
        expenses = session.recurring_expenses,
    )
}
