//! The financial advisor and the contextual characters.
//!
//! The [`Advisor`] trait is the contract for scenario advice and for the
//! in-world character messages (Vasooli the recovery agent, Sundar the
//! scamster, Harshad the risk-taker, Jetta the business mentor). The
//! shipped [`CuratedAdvisor`] is fully deterministic: advice comes from a
//! keyword-keyed catalogue, characters from fixed scripts. An LLM-backed
//! implementation can be injected in its place; the engine treats both
//! identically.

use crate::card::Choice;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Where a piece of advice came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceSource {
    Ai,
    Curated,
}

/// Advice for the current scenario card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub advice: String,
    pub source: AdviceSource,
}

/// The contextual characters that can interrupt a month boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CharacterId {
    Vasooli,
    Sundar,
    Harshad,
    Jetta,
}

/// A character interjection shown to the player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotMessage {
    pub character: CharacterId,
    pub message: String,
    pub choices: Vec<String>,
    /// True only for Sundar's offers; the accept path routes through
    /// `process_scam_choice`.
    pub is_scam: bool,
    /// Amount at stake when `is_scam` is set.
    pub scam_loss_amount: i64,
}

/// Contract for advice generation.
pub trait Advisor: Send + Sync {
    /// Advice for a scenario. Must always succeed; implementations with a
    /// fallible backend fall back to curated content internally.
    fn advise(
        &self,
        title: &str,
        description: &str,
        choices: &[Choice],
        wealth: i64,
        happiness: i64,
    ) -> Advice;

    /// A character interjection for the given trigger.
    fn character_message(
        &self,
        character: CharacterId,
        trigger_reason: &str,
        wealth: i64,
        scam_loss_amount: i64,
    ) -> ChatbotMessage;
}

/// Keyword-keyed curated advice. Deterministic: the variant is picked from
/// the player's stats, not from an RNG, so identical states repeat advice.
pub struct CuratedAdvisor;

const SOCIAL_TIPS: &[&str] = &[
    "Social events are important, but set a budget before attending. It's okay to say 'I'll catch the next one' if finances are tight.",
    "Before spending on social events, ask yourself: is this a need or a want? Your future self will thank you.",
    "Think 50-30-20: 50% needs, 30% wants (social events live here), 20% savings. Where does this fit?",
];

const IMPULSE_TIPS: &[&str] = &[
    "A discount on something you don't need isn't a saving, it's still spending. Would you buy this at full price?",
    "Impulse buys breed regret. Try the 24-hour rule: wait a day before any non-essential purchase.",
    "Just because something is on sale doesn't mean you can afford it. Check the budget first.",
];

const INVESTING_TIPS: &[&str] = &[
    "Start investing early, even small amounts. A \u{20B9}500 monthly SIP grows surprisingly large through compounding.",
    "Don't put all eggs in one basket. Split between safe options and growth options.",
    "Before investing, build an emergency fund of 3-6 months of expenses. Then invest consistently.",
];

const DEBT_TIPS: &[&str] = &[
    "Avoid high-interest debt like credit-card revolving and instant loan apps. They are a trap.",
    "The EMI rule: total EMIs should stay under 40% of monthly income. Beyond that is financial stress.",
    "Good debt funds assets (education, home); bad debt funds lifestyle. Know which one you're signing.",
];

const EMERGENCY_TIPS: &[&str] = &[
    "This is exactly why an emergency fund matters: keep 3-6 months of expenses ready for the unexpected.",
    "In a true emergency, prioritise health and safety. Money can be earned back; health often can't.",
    "Health insurance at \u{20B9}500-1000 a month can save you lakhs later. Get covered before you need it.",
];

const GADGET_TIPS: &[&str] = &[
    "Gadgets depreciate fast. Is this an upgrade you need, or just want? Last year's model usually does the job.",
    "Before buying electronics on EMI, compute the total cost with interest. The sticker price lies.",
    "The best phone is the one you can afford without stress. Function over fashion.",
];

const INSURANCE_TIPS: &[&str] = &[
    "Insurance is for protection, not investment. Term cover is cheap and does the one job well.",
    "Medical inflation runs ~15% a year. Health cover is a need, not a want.",
    "Read the policy before buying. Traditional bundled policies often return less than a plain fund.",
];

const GENERIC_TIPS: &[&str] = &[
    "Track every rupee for one month. You will be surprised where the money goes.",
    "Remember 50-30-20: 50% needs, 30% wants, 20% savings. Small discipline, big wealth.",
    "Pay yourself first: move savings out the day salary lands, before anything else.",
    "Today's money decisions shape tomorrow. Think long-term, but enjoy life responsibly.",
    "Before any purchase ask: need, want, or nice-to-have? Spend in that order.",
];

const KEYWORD_CATALOGUE: &[(&[&str], &[&str])] = &[
    (&["friend", "party", "wedding", "festival", "celebration", "farewell", "trip"], SOCIAL_TIPS),
    (&["sale", "discount", "offer", "deal", "shopping"], IMPULSE_TIPS),
    (&["investment", "mutual fund", "stock", "sip", "ipo", "deposit"], INVESTING_TIPS),
    (&["loan", "emi", "credit", "borrow", "debt"], DEBT_TIPS),
    (&["emergency", "hospital", "accident", "repair", "urgent", "breakdown"], EMERGENCY_TIPS),
    (&["phone", "gadget", "laptop", "electronics", "upgrade", "tv"], GADGET_TIPS),
    (&["insurance", "policy", "term", "health"], INSURANCE_TIPS),
];

impl CuratedAdvisor {
    fn tips_for(title: &str, description: &str) -> &'static [&'static str] {
        let title = title.to_lowercase();
        let description = description.to_lowercase();
        for (keywords, tips) in KEYWORD_CATALOGUE {
            if keywords.iter().any(|k| title.contains(k) || description.contains(k)) {
                return tips;
            }
        }
        GENERIC_TIPS
    }
}

impl Advisor for CuratedAdvisor {
    fn advise(
        &self,
        title: &str,
        description: &str,
        _choices: &[Choice],
        wealth: i64,
        happiness: i64,
    ) -> Advice {
        let tips = Self::tips_for(title, description);
        let pick = ((wealth + happiness).unsigned_abs() as usize) % tips.len();
        Advice { advice: tips[pick].to_string(), source: AdviceSource::Curated }
    }

    fn character_message(
        &self,
        character: CharacterId,
        trigger_reason: &str,
        wealth: i64,
        scam_loss_amount: i64,
    ) -> ChatbotMessage {
        match character {
            CharacterId::Vasooli => ChatbotMessage {
                character,
                message: format!(
                    "Vasooli Bhai is at the door: \"{}. EMIs don't pay themselves, boss. \
                     Clear the dues before the interest clears you.\"",
                    trigger_reason
                ),
                choices: vec![
                    "Prioritise the EMIs this month".to_string(),
                    "Negotiate a payment plan".to_string(),
                ],
                is_scam: false,
                scam_loss_amount: 0,
            },
            CharacterId::Sundar => ChatbotMessage {
                character,
                message: format!(
                    "Sundar slides into your DMs: \"Bhai, exclusive pre-IPO allotment, \
                     guaranteed 3x in 90 days. Only \u{20B9}{} needed, slots closing tonight!\"",
                    scam_loss_amount
                ),
                choices: vec!["Invest now".to_string(), "Ignore the offer".to_string()],
                is_scam: true,
                scam_loss_amount,
            },
            CharacterId::Harshad => ChatbotMessage {
                character,
                message: format!(
                    "Harshad laughs at your bank balance: \"\u{20B9}{} sleeping in savings? \
                     Inflation is eating it alive. Markets reward the invested, not the idle.\"",
                    wealth
                ),
                choices: vec![
                    "Explore the market tab".to_string(),
                    "Keep the cash for now".to_string(),
                ],
                is_scam: false,
                scam_loss_amount: 0,
            },
            CharacterId::Jetta => ChatbotMessage {
                character,
                message: format!(
                    "Jetta Bhai reviews your books: \"{}. Margins, beta, margins. \
                     Cut one useless expense this month and watch the difference.\"",
                    trigger_reason
                ),
                choices: vec![
                    "Audit recurring expenses".to_string(),
                    "Carry on as is".to_string(),
                ],
                is_scam: false,
                scam_loss_amount: 0,
            },
        }
    }
}
