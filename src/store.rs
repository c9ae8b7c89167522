use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::assembler::TicketOutcome;
use crate::grading::{FixtureResult, Verdict};
use crate::leg_pool::FixtureOdds;
use crate::payload::{EvaluationPayload, StoredTicket, TicketPayload, parse_stored_ticket_json};

const TICKET_SUFFIX: &str = "plus.json";
const DAILY_LOG_FILE: &str = "daily_log.json";
const EVAL_LOG_FILE: &str = "eval_log.json";
const EVAL_PREFIX: &str = "eval_";

#[derive(Debug, Serialize)]
struct DailyLog<'a> {
    date: &'a str,
    tickets_count: usize,
    built_count: usize,
    files: &'a [String],
    generated_at_utc: String,
}

#[derive(Debug, Serialize)]
struct EvalLog<'a> {
    date: Option<&'a str>,
    evaluated_at_utc: String,
    tickets: Vec<EvalLogEntry>,
}

#[derive(Debug, Serialize)]
struct EvalLogEntry {
    name: String,
    ticket_result: Verdict,
    wins: usize,
    loses: usize,
    pendings: usize,
}

/// "2plus" for 2.0, "2_5plus" for 2.5.
pub fn ticket_key(target: f64) -> String {
    if target.fract() == 0.0 {
        format!("{}plus", target as u64)
    } else {
        format!("{target}plus").replace('.', "_")
    }
}

pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("serialize json")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

/// Writes one file per target plus the daily log. Failed targets are written
/// with no legs so consumers always find all files.
pub fn write_tickets(dir: &Path, date: &str, outcomes: &[TicketOutcome]) -> Result<Vec<String>> {
    let mut files = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let name = format!("{}.json", ticket_key(outcome.target_odds));
        let payload = TicketPayload::from_outcome(date, outcome);
        write_json_atomic(&dir.join(&name), &payload)?;
        files.push(name);
    }

    let log = DailyLog {
        date,
        tickets_count: outcomes.len(),
        built_count: outcomes.iter().filter(|o| o.ticket.is_some()).count(),
        files: &files,
        generated_at_utc: Utc::now().to_rfc3339(),
    };
    write_json_atomic(&dir.join(DAILY_LOG_FILE), &log)?;
    Ok(files)
}

/// Ticket files in `dir`, keyed by name without extension, sorted by name.
pub fn load_tickets(dir: &Path) -> Result<Vec<(String, StoredTicket)>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TICKET_SUFFIX) && !n.starts_with(EVAL_PREFIX))
        })
        .collect();
    paths.sort();

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let ticket = parse_stored_ticket_json(&raw)
            .with_context(|| format!("decode {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        out.push((name, ticket));
    }
    Ok(out)
}

pub fn write_evaluations(dir: &Path, evaluations: &[EvaluationPayload]) -> Result<Vec<String>> {
    let mut files = Vec::with_capacity(evaluations.len());
    let mut entries = Vec::with_capacity(evaluations.len());
    for (idx, eval) in evaluations.iter().enumerate() {
        let name = eval.name.clone().unwrap_or_else(|| format!("ticket{idx}"));
        let file = format!("{EVAL_PREFIX}{name}.json");
        write_json_atomic(&dir.join(&file), eval)?;
        files.push(file);
        entries.push(EvalLogEntry {
            name,
            ticket_result: eval.ticket_result,
            wins: eval.wins,
            loses: eval.loses,
            pendings: eval.pendings,
        });
    }

    let log = EvalLog {
        date: evaluations.iter().find_map(|e| e.date.as_deref()),
        evaluated_at_utc: Utc::now().to_rfc3339(),
        tickets: entries,
    };
    write_json_atomic(&dir.join(EVAL_LOG_FILE), &log)?;
    Ok(files)
}

pub fn save_fixture_snapshot(path: &Path, fixtures: &[FixtureOdds]) -> Result<()> {
    write_json_atomic(path, fixtures)
}

pub fn load_fixture_snapshot(path: &Path) -> Result<Vec<FixtureOdds>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).context("invalid fixture snapshot json")
}

pub fn load_results_snapshot(path: &Path) -> Result<HashMap<u64, FixtureResult>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let rows: Vec<FixtureResult> =
        serde_json::from_str(&raw).context("invalid results snapshot json")?;
    Ok(rows.into_iter().map(|r| (r.fixture_id, r)).collect())
}

#[cfg(test)]
mod tests {
    use super::ticket_key;

    #[test]
    fn ticket_keys_follow_target() {
        assert_eq!(ticket_key(2.0), "2plus");
        assert_eq!(ticket_key(4.0), "4plus");
        assert_eq!(ticket_key(2.5), "2_5plus");
    }
}
