//! The built-in scenario deck and the card-selection policy.
//!
//! The deck is the deterministic fallback behind the scenario generator: a
//! hand-written set of cards covering every category and difficulty so a
//! full 60-month game can always be dealt. Selection filters by the level's
//! card filter and the already-shown set, then relaxes the filters one at a
//! time (category, then difficulty, then the unseen restriction) until a
//! candidate remains.

use crate::card::{CardCategory, Choice, MarketEvent, ScenarioCard};
use crate::config::LevelCardFilter;
use crate::dice::Dice;
use crate::market::Sector;
use std::collections::{BTreeMap, HashSet};

fn card(
    id: i64,
    title: &str,
    description: &str,
    category: CardCategory,
    difficulty: u8,
    min_month: u32,
    choices: Vec<Choice>,
) -> ScenarioCard {
    ScenarioCard {
        id,
        title: title.to_string(),
        description: description.to_string(),
        category,
        difficulty,
        min_month,
        is_active: true,
        is_generated: false,
        market_event: None,
        choices,
    }
}

fn news_card(
    id: i64,
    title: &str,
    description: &str,
    min_month: u32,
    difficulty: u8,
    impacts: &[(Sector, f64)],
    choices: Vec<Choice>,
) -> ScenarioCard {
    let mut base = card(id, title, description, CardCategory::News, difficulty, min_month, choices);
    base.market_event = Some(MarketEvent {
        title: title.to_string(),
        description: description.to_string(),
        sector_impacts: impacts.iter().copied().collect::<BTreeMap<_, _>>(),
        is_active: true,
    });
    base
}

/// The hand-written fallback deck.
///
/// Card ids are stable; choice ids are `card_id * 100 + position` so a
/// play-log row can always be traced back to its card.
pub fn builtin_deck() -> Vec<ScenarioCard> {
    use CardCategory::*;
    vec![
        card(
            1,
            "Monthly Grocery Run",
            "The fridge is empty. The local kirana is pricier but near; the hypermarket needs an auto ride but has offers.",
            Needs,
            1,
            1,
            vec![
                Choice::new(101, "Stock up at the hypermarket with a list")
                    .impacts(-200, 2, 0, 5)
                    .feedback("Planned shopping with a list avoids impulse buys. Well done!")
                    .recommended(),
                Choice::new(102, "Grab everything at the kirana, no list")
                    .impacts(-600, 3, 0, 0)
                    .feedback("Convenience costs. Small leaks sink big ships."),
                Choice::new(103, "Order groceries online with express delivery")
                    .impacts(-900, 4, 0, -2)
                    .feedback("Delivery fees and impulse add-ons pile up fast."),
            ],
        ),
        card(
            2,
            "Flash Sale: 60% Off Fashion",
            "Your favourite brand is running a 24-hour flash sale. The wishlist is calling.",
            Wants,
            1,
            1,
            vec![
                Choice::new(201, "Buy only what was already on the wishlist")
                    .impacts(-1500, 8, 0, 3)
                    .feedback("A discount on a planned purchase is real savings."),
                Choice::new(202, "Skip it. A sale is not a need")
                    .impacts(0, -3, 0, 5)
                    .feedback("Would you buy it at full price? If not, it was never a deal.")
                    .recommended(),
                Choice::new(203, "Splurge on the whole cart")
                    .impacts(-5000, 12, 0, -5)
                    .feedback("60% off still means 40% spent on things you didn't plan for."),
            ],
        ),
        card(
            3,
            "College Friend's Wedding",
            "A close friend is getting married in Jaipur. Travel, outfit, and a gift add up.",
            Social,
            2,
            1,
            vec![
                Choice::new(301, "Attend with a sensible budget")
                    .impacts(-4000, 10, 0, 5)
                    .feedback("Relationships matter. A planned budget lets you enjoy guilt-free.")
                    .recommended(),
                Choice::new(302, "Go all out: designer outfit, lavish gift")
                    .impacts(-12000, 15, 0, -5)
                    .feedback("One weekend wiped out half a month's salary."),
                Choice::new(303, "Send a gift and skip the trip")
                    .impacts(-1000, -8, 0, 2)
                    .feedback("Money saved, but some moments don't come back."),
            ],
        ),
        card(
            4,
            "Bike Breakdown",
            "Your bike died on the highway. The mechanic quotes a major repair.",
            Emergency,
            2,
            1,
            vec![
                Choice::new(401, "Pay for the full repair now")
                    .impacts(-3000, -2, 0, 3)
                    .feedback("Fixing it properly once beats fixing it cheaply twice.")
                    .recommended(),
                Choice::new(402, "Patch it up cheap")
                    .impacts(-800, -1, 0, 0)
                    .feedback("A stopgap. Budget for the real repair soon."),
                Choice::new(403, "Ignore it and take cabs everywhere")
                    .impacts(-2000, 1, 0, -3)
                    .feedback("Avoiding a fixed cost with a bigger variable cost."),
            ],
        ),
        card(
            5,
            "New Smartphone Launch",
            "The new flagship just dropped. Your phone works fine, but the EMI banner says \u{20B9}1,500/month.",
            Wants,
            2,
            1,
            vec![
                Choice::new(501, "Keep the current phone")
                    .impacts(0, -2, 0, 5)
                    .feedback("Last year's model does 95% of the job at 0% of the cost.")
                    .recommended(),
                Choice::new(502, "Buy on 12-month EMI")
                    .impacts(0, 10, -5, -5)
                    .adds_expense("Phone EMI", 1500)
                    .feedback("EMIs turn a want into a monthly obligation."),
                Choice::new(503, "Buy outright with savings")
                    .impacts(-18000, 8, 0, -2)
                    .feedback("No debt at least, but that was a big bite of your savings."),
            ],
        ),
        card(
            6,
            "Weekend Trip with Flatmates",
            "The flat is planning a hill-station weekend. Split four ways it's still real money.",
            Social,
            1,
            1,
            vec![
                Choice::new(601, "Join with a fixed spending cap")
                    .impacts(-2500, 10, 0, 3)
                    .feedback("Fun within a budget is still fun.")
                    .recommended(),
                Choice::new(602, "Join and swipe freely")
                    .impacts(-6000, 12, 0, -3)
                    .feedback("Memories are priceless; the credit card bill is not."),
                Choice::new(603, "Stay back this time")
                    .impacts(0, -6, 0, 2)
                    .feedback("Saying no sometimes is a skill. Don't make it every time."),
            ],
        ),
        card(
            7,
            "Health Insurance Offer",
            "An insurer offers a \u{20B9}5 lakh cover at \u{20B9}800/month. You're young and healthy \u{2014} is it worth it?",
            Needs,
            2,
            2,
            vec![
                Choice::new(701, "Take the term health cover")
                    .impacts(0, -1, 0, 10)
                    .adds_expense("Health Insurance Premium", 800)
                    .feedback("Medical inflation runs ~15% a year. Cover before you need it.")
                    .recommended(),
                Choice::new(702, "Skip it, you're healthy")
                    .impacts(0, 1, 0, -5)
                    .feedback("One hospital week can cost a year's salary. Risky."),
            ],
        ),
        card(
            8,
            "Hospital Visit",
            "A bad bout of dengue lands you in hospital for three days.",
            Emergency,
            3,
            3,
            vec![
                Choice::new(801, "Use savings for the bill")
                    .impacts(-8000, -10, 0, 5)
                    .feedback("This is exactly what an emergency fund is for.")
                    .recommended(),
                Choice::new(802, "Swipe the credit card and revolve")
                    .impacts(-2000, -8, -30, -5)
                    .feedback("Revolving credit at 40% p.a. turns one bill into many."),
                Choice::new(803, "Delay treatment to save money")
                    .impacts(-1000, -20, 0, -5)
                    .feedback("Health first. Money can be earned back."),
            ],
        ),
        card(
            9,
            "Credit Card Offer",
            "A lifetime-free credit card with a \u{20B9}50,000 limit and lounge access. The agent is persuasive.",
            Debt,
            3,
            6,
            vec![
                Choice::new(901, "Take it, pay in full every month")
                    .impacts(0, 3, 10, 10)
                    .feedback("Used with discipline, a card builds your credit history.")
                    .recommended(),
                Choice::new(902, "Take it and pay minimum due")
                    .impacts(2000, 5, -40, -10)
                    .feedback("Minimum due is the most expensive money you'll ever borrow."),
                Choice::new(903, "Refuse \u{2014} cards are dangerous")
                    .impacts(0, 0, -2, 2)
                    .feedback("Avoiding credit entirely also means no credit history."),
            ],
        ),
        card(
            10,
            "Festive Season Sale",
            "Diwali sales everywhere: electronics, clothes, home upgrades, all '70% off'.",
            Shopping,
            3,
            6,
            vec![
                Choice::new(1001, "Budget \u{20B9}3,000 for gifts and sweets")
                    .impacts(-3000, 8, 0, 5)
                    .feedback("Festivals are for family, not for EMIs.")
                    .recommended(),
                Choice::new(1002, "Upgrade the TV on no-cost EMI")
                    .impacts(0, 10, -10, -5)
                    .adds_expense("TV EMI", 2000)
                    .feedback("'No-cost' EMI hides the cost in the price and your flexibility."),
                Choice::new(1003, "Buy nothing at all")
                    .impacts(0, -5, 0, 2)
                    .feedback("Frugality taken too far can cost you joy."),
            ],
        ),
        card(
            11,
            "Streaming Subscriptions",
            "Three OTT apps, one music app, one fitness app. The renewals quietly total \u{20B9}499/month.",
            Wants,
            2,
            2,
            vec![
                Choice::new(1101, "Keep one, cancel the rest")
                    .impacts(0, -2, 0, 8)
                    .cancels_expense("OTT Subscriptions")
                    .feedback("Subscription audits are the easiest raise you'll ever get.")
                    .recommended(),
                Choice::new(1102, "Keep them all")
                    .impacts(0, 3, 0, -3)
                    .adds_expense("OTT Subscriptions", 499)
                    .feedback("\u{20B9}499 a month is \u{20B9}6,000 a year \u{2014} for apps you barely open."),
            ],
        ),
        card(
            12,
            "Salary Bonus: Prepay the EMI?",
            "A \u{20B9}10,000 performance bonus lands. Your phone EMI still has months to run.",
            Debt,
            3,
            6,
            vec![
                Choice::new(1201, "Prepay and close the EMI")
                    .impacts(-8000, 5, 15, 10)
                    .cancels_expense("Phone EMI")
                    .feedback("Killing a recurring obligation beats a one-time treat.")
                    .recommended(),
                Choice::new(1202, "Spend the bonus on a getaway")
                    .impacts(-10000, 12, 0, -5)
                    .feedback("The EMI outlives the holiday."),
                Choice::new(1203, "Park the bonus in savings")
                    .impacts(0, 2, 0, 5)
                    .feedback("Safe, but the EMI interest outruns savings interest."),
            ],
        ),
        card(
            13,
            "Your First SIP",
            "A colleague shows you her mutual-fund SIP. \u{20B9}500/month, auto-debited, boring and steady.",
            Investment,
            3,
            12,
            vec![
                Choice::new(1301, "Start a \u{20B9}500 SIP")
                    .impacts(-500, 2, 0, 15)
                    .feedback("Compounding rewards the early and the consistent.")
                    .recommended(),
                Choice::new(1302, "Wait for the 'right time' to invest")
                    .impacts(0, 0, 0, -3)
                    .feedback("Time in the market beats timing the market."),
            ],
        ),
        card(
            14,
            "Hot Stock Tip",
            "A WhatsApp group promises a small-cap that will '3x in three weeks'. Screenshots of profits included.",
            Investment,
            4,
            12,
            vec![
                Choice::new(1401, "Ignore the tip")
                    .impacts(0, -2, 0, 10)
                    .feedback("If the tip were real, they wouldn't need to share it.")
                    .recommended(),
                Choice::new(1402, "Put in a small punt")
                    .impacts(-5000, 3, 0, -5)
                    .feedback("Small punts teach expensive lessons."),
                Choice::new(1403, "Go big \u{2014} screenshots don't lie")
                    .impacts(-20000, 5, 0, -15)
                    .feedback("Screenshots lie all the time. Pump and dump 101."),
            ],
        ),
        news_card(
            15,
            "Tech Rally: AI Boom",
            "Major tech companies announce breakthrough AI products. Analysts expect the tech sector to surge.",
            3,
            3,
            &[(Sector::Tech, 1.25), (Sector::Gold, 0.95), (Sector::RealEstate, 1.02)],
            vec![
                Choice::new(1501, "Read up and consider a tech position")
                    .impacts(0, 5, 0, 10)
                    .feedback("Acting on researched news is a core investing skill.")
                    .recommended(),
                Choice::new(1502, "Wait and watch")
                    .impacts(0, 0, 0, 5)
                    .feedback("Caution is fine; paralysis is not."),
                Choice::new(1503, "Dump any tech holdings")
                    .impacts(0, -5, 0, -5)
                    .feedback("Selling into good news often leaves money on the table."),
            ],
        ),
        news_card(
            16,
            "Global Uncertainty: Gold Rush",
            "International tensions rise and investors flee to safe havens. Gold is expected to climb.",
            5,
            3,
            &[(Sector::Gold, 1.20), (Sector::Tech, 0.90), (Sector::RealEstate, 0.98)],
            vec![
                Choice::new(1601, "Consider shifting some money to gold")
                    .impacts(0, 5, 0, 10)
                    .feedback("Gold is the classic hedge in uncertain times.")
                    .recommended(),
                Choice::new(1602, "Stay fully in risk assets")
                    .impacts(0, 0, 0, 0)
                    .feedback("Know your risk tolerance before the storm, not during."),
                Choice::new(1603, "Ignore the news entirely")
                    .impacts(0, 0, 0, -3)
                    .feedback("Macro news moves your portfolio whether you watch it or not."),
            ],
        ),
        news_card(
            17,
            "Tech Crash: Regulation Fears",
            "Sweeping new regulations threaten the big tech platforms. Investors are rattled.",
            8,
            4,
            &[(Sector::Tech, 0.75), (Sector::Gold, 1.10)],
            vec![
                Choice::new(1701, "Hold through the volatility")
                    .impacts(0, -3, 0, 10)
                    .feedback("Panic selling locks in losses. Volatility is the price of returns.")
                    .recommended(),
                Choice::new(1702, "Sell everything now")
                    .impacts(0, -5, 0, -5)
                    .feedback("Selling the bottom is how paper losses become real ones."),
                Choice::new(1703, "Buy the dip aggressively")
                    .impacts(0, 2, 0, 3)
                    .feedback("Catching falling knives takes conviction and a cash buffer."),
            ],
        ),
        news_card(
            18,
            "Real Estate Revival",
            "The government announces infrastructure spending and housing subsidies. Property sentiment turns.",
            10,
            4,
            &[(Sector::RealEstate, 1.15), (Sector::Tech, 1.05), (Sector::Gold, 1.0)],
            vec![
                Choice::new(1801, "Study the real-estate sector")
                    .impacts(0, 3, 0, 8)
                    .feedback("Policy tailwinds matter. Research before riding them.")
                    .recommended(),
                Choice::new(1802, "Property is for rich people, skip")
                    .impacts(0, 0, 0, -3)
                    .feedback("Sector exposure doesn't require buying a flat."),
            ],
        ),
        card(
            19,
            "Pop Quiz: Compounding",
            "\u{20B9}10,000 at 12% a year, compounded annually. Roughly how much after 6 years?",
            Quiz,
            4,
            24,
            vec![
                Choice::new(1901, "About \u{20B9}20,000 \u{2014} it doubles")
                    .impacts(0, 2, 0, 15)
                    .feedback("Rule of 72: 72/12 = 6 years to double. Sharp!")
                    .recommended(),
                Choice::new(1902, "About \u{20B9}17,000")
                    .impacts(0, 0, 0, 2)
                    .feedback("Close, but you forgot compounding on the interest itself."),
                Choice::new(1903, "About \u{20B9}13,000")
                    .impacts(0, -1, 0, -2)
                    .feedback("That's simple interest thinking. Compounding snowballs."),
            ],
        ),
        card(
            20,
            "Guaranteed Doubling Scheme",
            "A 'registered' chit promises to double your money in 10 months. Your neighbour already 'got paid'.",
            Trap,
            5,
            24,
            vec![
                Choice::new(2001, "Walk away and warn the neighbour")
                    .impacts(0, -1, 0, 15)
                    .feedback("Guaranteed high returns are guaranteed fraud. Early payouts are the bait.")
                    .recommended(),
                Choice::new(2002, "Invest a 'test' amount")
                    .impacts(-10000, -5, 0, -10)
                    .feedback("The test amount is exactly what the scheme wanted."),
            ],
        ),
        card(
            21,
            "Pop Quiz: Asset Allocation",
            "You're 26, stable job, 30-year horizon. Which mix fits a long-term goal?",
            Quiz,
            5,
            36,
            vec![
                Choice::new(2101, "Mostly equity, some debt, a little gold")
                    .impacts(0, 2, 0, 15)
                    .feedback("Long horizons can harvest the equity risk premium.")
                    .recommended(),
                Choice::new(2102, "All fixed deposits")
                    .impacts(0, 0, 0, -2)
                    .feedback("FDs barely beat inflation; 30 years of that is a slow leak."),
                Choice::new(2103, "All in on one hot sector")
                    .impacts(0, 1, 0, -5)
                    .feedback("Concentration builds wealth and destroys it. Diversify."),
            ],
        ),
        card(
            22,
            "Laptop Repair",
            "Your work laptop's screen gave out two days before a client deadline.",
            Emergency,
            2,
            4,
            vec![
                Choice::new(2201, "Repair at an authorised centre")
                    .impacts(-4000, -2, 0, 3)
                    .feedback("Tools of your trade deserve proper maintenance.")
                    .recommended(),
                Choice::new(2202, "Cheap local fix with used parts")
                    .impacts(-1500, -1, 0, 0)
                    .feedback("It might hold. It might not, right before the next deadline."),
            ],
        ),
        card(
            23,
            "Office Farewell Gift",
            "The team is pooling \u{20B9}1,000 each for a departing manager's gift.",
            Social,
            2,
            2,
            vec![
                Choice::new(2301, "Chip in the full share")
                    .impacts(-1000, 4, 0, 2)
                    .feedback("Social capital is an asset class too.")
                    .recommended(),
                Choice::new(2302, "Contribute a smaller amount")
                    .impacts(-300, 1, 0, 2)
                    .feedback("Give what your budget allows, without apology."),
                Choice::new(2303, "Decline to contribute")
                    .impacts(0, -4, 0, 0)
                    .feedback("Your call, but teams remember."),
            ],
        ),
        card(
            24,
            "Cook or Order In?",
            "Another late night at work. Cooking feels impossible; delivery apps feel inevitable.",
            Needs,
            1,
            1,
            vec![
                Choice::new(2401, "Meal-prep on Sunday for the week")
                    .impacts(-500, 1, 0, 5)
                    .feedback("One planned hour saves five impulsive dinners.")
                    .recommended(),
                Choice::new(2402, "Order in tonight, cook tomorrow")
                    .impacts(-300, 3, 0, 0)
                    .feedback("Fine occasionally. Watch it becoming the default."),
                Choice::new(2403, "Order in all week")
                    .impacts(-2500, 5, 0, -3)
                    .feedback("Delivery five nights a week is a second rent."),
            ],
        ),
    ]
}

/// Picks the next card for a session.
///
/// Filters: active, hand-written, `min_month` reached, difficulty within the
/// level cap, category in the level allow-list, not yet shown. When the set
/// is empty the filters relax in order: category first, then difficulty,
/// then already-shown cards are allowed again. Returns `None` only for an
/// empty deck.
pub fn select_card(
    deck: &[ScenarioCard],
    current_month: u32,
    filter: &LevelCardFilter,
    shown: &HashSet<i64>,
    dice: &mut dyn Dice,
) -> Option<ScenarioCard> {
    let base = |c: &&ScenarioCard| c.is_active && !c.is_generated && c.min_month <= current_month;
    let within_difficulty = |c: &&ScenarioCard| c.difficulty <= filter.max_difficulty;
    let in_category = |c: &&ScenarioCard| match &filter.categories {
        Some(allowed) => allowed.contains(&c.category),
        None => true,
    };
    let unseen = |c: &&ScenarioCard| !shown.contains(&c.id);

    let mut candidates: Vec<&ScenarioCard> = deck
        .iter()
        .filter(base)
        .filter(within_difficulty)
        .filter(in_category)
        .filter(unseen)
        .collect();

    if candidates.is_empty() {
        candidates = deck.iter().filter(base).filter(within_difficulty).filter(unseen).collect();
    }
    if candidates.is_empty() {
        candidates = deck.iter().filter(base).filter(unseen).collect();
    }
    if candidates.is_empty() {
        candidates = deck.iter().filter(base).collect();
    }
    if candidates.is_empty() {
        return None;
    }

    let pick = dice.index(candidates.len());
    Some(candidates[pick].clone())
}
