use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use focus_tickets::api_football::{ApiFootball, ApiFootballConfig};
use focus_tickets::assembler::build_daily_tickets;
use focus_tickets::config::{RunConfig, local_date};
use focus_tickets::evaluation::evaluate_ticket;
use focus_tickets::grading::Verdict;
use focus_tickets::logging;
use focus_tickets::payload::EvaluationPayload;
use focus_tickets::store;
use focus_tickets::thresholds::ThresholdTable;

/// Daily parlay tickets from football odds, graded against final scores.
#[derive(Parser, Debug)]
#[command(name = "focus_tickets")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble one ticket per target odds and write the ticket files
    Build(BuildArgs),
    /// Grade the ticket files in the output directory
    Evaluate(EvaluateArgs),
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Fixture date (YYYY-MM-DD), defaults to today in TIMEZONE
    #[arg(long)]
    date: Option<String>,
    /// Replay a saved fixture/odds snapshot instead of calling the provider
    #[arg(long)]
    fixtures: Option<PathBuf>,
    /// Save the fetched fixtures and odds for later replay
    #[arg(long)]
    save_snapshot: Option<PathBuf>,
    /// Output directory, defaults to PUBLIC_DIR
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct EvaluateArgs {
    /// Replay saved fixture results instead of calling the provider
    #[arg(long)]
    results: Option<PathBuf>,
    /// Directory holding the ticket files, defaults to PUBLIC_DIR
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init("info");

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Evaluate(args) => run_evaluate(args),
    };
    if let Err(err) = outcome {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run_build(args: BuildArgs) -> Result<()> {
    let cfg = RunConfig::from_env();
    let date = match args.date {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid --date {raw:?}"))?
            .format("%Y-%m-%d")
            .to_string(),
        None => local_date(Utc::now(), cfg.timezone),
    };
    info!(
        date = %date,
        timezone = %cfg.timezone,
        targets = ?cfg.targets,
        legs_min = cfg.rules.legs_min,
        legs_max = cfg.rules.legs_max,
        "build run"
    );

    let fixtures = match args.fixtures.as_deref() {
        Some(path) => store::load_fixture_snapshot(path)?,
        None => ApiFootball::new(ApiFootballConfig::from_env())?.fetch_fixture_odds(&date)?,
    };
    if let Some(path) = args.save_snapshot.as_deref() {
        store::save_fixture_snapshot(path, &fixtures)?;
    }

    let outcomes = build_daily_tickets(
        &fixtures,
        &ThresholdTable::baseline(),
        &cfg.targets,
        &cfg.rules,
        &cfg.relax,
    );
    let out_dir = args.out.unwrap_or(cfg.public_dir);
    let files = store::write_tickets(&out_dir, &date, &outcomes)?;

    let built = outcomes.iter().filter(|o| o.ticket.is_some()).count();
    let summary = json!({
        "ok": true,
        "date": date,
        "tickets": outcomes.len(),
        "built": built,
        "files": files,
    });
    println!("{summary}");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let cfg = RunConfig::from_env();
    let dir = args.out.unwrap_or(cfg.public_dir);
    let tickets = store::load_tickets(&dir)?;
    if tickets.is_empty() {
        println!("{}", json!({ "ok": false, "msg": "no input files" }));
        return Ok(());
    }

    let ids: Vec<u64> = tickets
        .iter()
        .flat_map(|(_, ticket)| ticket.legs.iter().filter_map(|leg| leg.fixture_id))
        .collect();
    let results = match args.results.as_deref() {
        Some(path) => store::load_results_snapshot(path)?,
        None => ApiFootball::new(ApiFootballConfig::from_env())?.fetch_results(&ids),
    };

    let evaluations: Vec<EvaluationPayload> = tickets
        .iter()
        .map(|(name, ticket)| evaluate_ticket(Some(name.as_str()), ticket, &results, &cfg.finals))
        .collect();
    for eval in &evaluations {
        info!(
            name = eval.name.as_deref().unwrap_or_default(),
            result = %eval.ticket_result,
            wins = eval.wins,
            loses = eval.loses,
            pendings = eval.pendings,
            "ticket graded"
        );
    }
    let files = store::write_evaluations(&dir, &evaluations)?;

    let settled = evaluations
        .iter()
        .filter(|e| e.ticket_result != Verdict::Pending)
        .count();
    println!(
        "{}",
        json!({ "ok": true, "tickets": evaluations.len(), "settled": settled, "files": files })
    );
    Ok(())
}
