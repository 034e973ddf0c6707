use arth_neeti::engine::GameEngine;
use arth_neeti::providers::{Auth, Providers, StaticAuth};
use arth_neeti::{EndReason, GameConfig, SeededDice, SessionStore};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "arth-neeti")]
#[command(about = "Auto-plays Arth-Neeti sessions against the game engine for balance inspection.")]
struct Args {
    /// Number of games to simulate; more than one runs in parallel
    #[arg(short, long, default_value_t = 1)]
    games: usize,

    /// Base RNG seed; game i plays with seed + i
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Path to a game config file (YAML or TOML) overriding the defaults
    #[arg(short, long)]
    config: Option<String>,

    /// SQLite database path (single game only; default is in-memory)
    #[arg(long)]
    db: Option<String>,

    /// Identity to play as; resolved to a stable user id
    #[arg(long, default_value = "guest")]
    identity: String,

    /// Print the final report of the first game
    #[arg(long, default_value_t = false)]
    report: bool,

    /// Translate the printed report to this language code
    #[arg(long)]
    lang: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Disable colored output
    #[arg(long, default_value_t = false)]
    no_color: bool,

    /// Rayon worker threads (default: logical cores)
    #[arg(long)]
    threads: Option<usize>,
}

struct GameResult {
    reason: EndReason,
    persona: String,
    final_wealth: i64,
    months_played: u32,
    literacy: i64,
    report: Option<String>,
}

fn play_one_game(
    config: &GameConfig,
    seed: u64,
    db: Option<&str>,
    identity: &str,
    want_report: bool,
    lang: Option<&str>,
) -> Result<GameResult, Box<dyn std::error::Error + Send + Sync>> {
    let store = match db {
        Some(path) => SessionStore::open(path)?,
        None => SessionStore::open_in_memory()?,
    };
    let engine = GameEngine::new(
        store,
        config.clone(),
        Providers::default(),
        Box::new(SeededDice::new(seed)),
    );
    let auth = StaticAuth::single(identity, 1);
    let user_id = auth.resolve(identity)?;

    let session = engine.start_new_session(user_id)?;
    let session_id = session.id;
    info!("playing session {} with seed {}", session_id, seed);

    // The bot picks uniformly among choices and always declines scams.
    let mut bot = StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9));
    let turn_cap = config.game_duration_months * config.cards_per_month + 8;

    for _turn in 0..turn_cap {
        let Some(card) = engine.get_next_card(user_id, session_id)? else {
            warn!("deck ran dry in session {}", session_id);
            break;
        };
        let choice = &card.choices[bot.random_range(0..card.choices.len())];
        let outcome = engine.submit_choice(user_id, session_id, card.id, choice.id)?;

        if !outcome.game_over {
            if let Some(chat) = &outcome.chatbot {
                if chat.is_scam {
                    engine.process_scam_choice(user_id, session_id, false, chat.scam_loss_amount)?;
                }
            }
            continue;
        }

        let persona = outcome
            .final_persona
            .map(|p| p.persona)
            .unwrap_or_else(|| "Unknown".to_string());
        let report = if want_report {
            engine.get_final_report(user_id, session_id, lang)?
        } else {
            None
        };
        let reason = outcome
            .game_over_reason
            .ok_or("game over without a reason")?;
        return Ok(GameResult {
            reason,
            persona,
            final_wealth: outcome.session.wealth,
            months_played: outcome.session.current_month,
            literacy: outcome.session.financial_literacy,
            report,
        });
    }

    Err(format!("session {} did not terminate within {} turns", session_id, turn_cap).into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &args.log_level);
    }
    env_logger::init();

    if args.games == 0 {
        return Err("at least one game is required".into());
    }
    if args.db.is_some() && args.games > 1 {
        return Err("--db is only supported with a single game".into());
    }

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new().num_threads(threads).build_global()?;
    }

    let config = match &args.config {
        Some(path) => GameConfig::from_file(path)?,
        None => GameConfig::default(),
    };
    config.validate()?;

    let progress = ProgressBar::new(args.games as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} games {elapsed_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let results: Vec<_> = (0..args.games)
        .into_par_iter()
        .map(|i| {
            let want_report = args.report && i == 0;
            let result = play_one_game(
                &config,
                args.seed + i as u64,
                args.db.as_deref(),
                &args.identity,
                want_report,
                args.lang.as_deref(),
            );
            progress.inc(1);
            result
        })
        .collect();
    progress.finish_and_clear();

    let mut outcomes: Vec<GameResult> = Vec::new();
    for result in results {
        outcomes.push(result.map_err(|e| -> Box<dyn std::error::Error> { e })?);
    }

    println!("{}", "=== Arth-Neeti Simulation Summary ===".bold());
    println!("Games played: {}", outcomes.len());

    let mut by_reason: HashMap<EndReason, usize> = HashMap::new();
    let mut by_persona: HashMap<String, usize> = HashMap::new();
    for outcome in &outcomes {
        *by_reason.entry(outcome.reason).or_default() += 1;
        *by_persona.entry(outcome.persona.clone()).or_default() += 1;
    }

    for (reason, count) in &by_reason {
        let label = match reason {
            EndReason::Completed => "COMPLETED".green(),
            EndReason::Bankruptcy => "BANKRUPTCY".red(),
            EndReason::Burnout => "BURNOUT".yellow(),
        };
        println!("  {}: {}", label, count);
    }

    let avg_wealth: i64 =
        outcomes.iter().map(|o| o.final_wealth).sum::<i64>() / outcomes.len() as i64;
    let avg_months: f64 =
        outcomes.iter().map(|o| o.months_played as f64).sum::<f64>() / outcomes.len() as f64;
    let avg_literacy: i64 =
        outcomes.iter().map(|o| o.literacy).sum::<i64>() / outcomes.len() as i64;
    println!("Average final wealth: \u{20B9}{}", avg_wealth);
    println!("Average months played: {:.1}", avg_months);
    println!("Average financial literacy: {}", avg_literacy);

    println!("Personas:");
    let mut personas: Vec<_> = by_persona.into_iter().collect();
    personas.sort_by(|a, b| b.1.cmp(&a.1));
    for (persona, count) in personas {
        println!("  {}: {}", persona.as_str().cyan(), count);
    }

    if args.report {
        if let Some(report) = outcomes.first().and_then(|o| o.report.as_deref()) {
            println!("\n{}", "=== Final Report (game 1) ===".bold());
            println!("{}", report);
        }
    }

    Ok(())
}
