//! Headless match runner
//!
//! Loads a rules file and two team files, runs one or more seeded matches and
//! prints the trace (JSON) or a short summary (text).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hexbrawl::battle::{CombatEventKind, MatchOutcome, MatchReport};
use hexbrawl::{load_rules, load_team, simulate, simulate_many, Side};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Headless match runner - seeded auto-battler matches from the command line
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run deterministic hex auto-battler matches and print the result")]
struct Args {
    /// Rules file (TOML)
    #[arg(long, default_value = "data/rules/default.toml")]
    rules: PathBuf,

    /// Team file for side A (JSON)
    #[arg(long, default_value = "data/teams/vanguard.json")]
    team_a: PathBuf,

    /// Team file for side B (JSON)
    #[arg(long, default_value = "data/teams/arcanists.json")]
    team_b: PathBuf,

    /// Random seed for deterministic runs
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of matches to run, using seeds seed..seed+batch
    #[arg(long, default_value_t = 1)]
    batch: u64,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,

    /// Include the full event trace in JSON output / print it in text output
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Batch summary
#[derive(Serialize, Default)]
struct BatchSummary {
    matches: u64,
    wins_a: u64,
    wins_b: u64,
    draws: u64,
    average_ticks: f64,
}

impl BatchSummary {
    fn from_reports(reports: &[MatchReport]) -> Self {
        let mut summary = BatchSummary {
            matches: reports.len() as u64,
            ..Default::default()
        };
        let mut ticks = 0u64;
        for report in reports {
            ticks += report.result.final_tick;
            match report.result.outcome.winner() {
                Some(Side::A) => summary.wins_a += 1,
                Some(Side::B) => summary.wins_b += 1,
                None => summary.draws += 1,
            }
        }
        if !reports.is_empty() {
            summary.average_ticks = ticks as f64 / reports.len() as f64;
        }
        summary
    }
}

fn describe(outcome: &MatchOutcome) -> String {
    match outcome {
        MatchOutcome::Winner { side } => format!("side {} wins", side),
        MatchOutcome::Draw { reason } => format!("draw ({:?})", reason),
    }
}

fn print_text(report: &MatchReport, verbose: bool) {
    println!("Match (seed {})", report.seed);
    println!("=================");
    if verbose {
        for event in &report.events {
            if matches!(event.event, CombatEventKind::Move { .. }) {
                continue;
            }
            println!("[{:>5}] {:<15} {:?}", event.tick, event.event.label(), event.event);
        }
        println!();
    }
    println!("Outcome: {}", describe(&report.result.outcome));
    println!("Ticks: {}", report.result.final_tick);
    println!("Remaining units: {}", report.result.remaining_units);
    println!(
        "Damage: {:.1} total ({:.1} by A, {:.1} by B)",
        report.result.damage.total, report.result.damage.side_a, report.result.damage.side_b
    );
    println!("Events: {}", report.events.len());
}

fn run(args: &Args) -> hexbrawl::Result<()> {
    let rules = load_rules(&args.rules)?;
    let team_a = load_team(&args.team_a)?;
    let team_b = load_team(&args.team_b)?;
    let json = match args.format.as_str() {
        "json" => true,
        "text" => false,
        other => {
            eprintln!("Unknown format '{}', defaulting to text", other);
            false
        }
    };

    if args.batch <= 1 {
        let report = simulate(&rules, &team_a, &team_b, args.seed)?;
        if json {
            if args.verbose {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&report.result)?);
            }
        } else {
            print_text(&report, args.verbose);
        }
        return Ok(());
    }

    let seeds: Vec<u64> = (0..args.batch).map(|i| args.seed.wrapping_add(i)).collect();
    let reports = simulate_many(&rules, &team_a, &team_b, &seeds)?;
    let summary = BatchSummary::from_reports(&reports);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for report in &reports {
            println!(
                "seed {:>6}: {:<28} tick {:>5}",
                report.seed,
                describe(&report.result.outcome),
                report.result.final_tick
            );
        }
        println!();
        println!(
            "{} matches: A {} / B {} / draws {} (avg {:.1} ticks)",
            summary.matches, summary.wins_a, summary.wins_b, summary.draws, summary.average_ticks
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hexbrawl=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("battle_runner: {}", error);
            ExitCode::FAILURE
        }
    }
}
