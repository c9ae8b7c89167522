use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assembler::TicketOutcome;
use crate::grading::Verdict;

/// Ticket file written for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPayload {
    pub date: String,
    pub target_odds: f64,
    /// Raw product of leg odds; `None` when no ticket could be assembled.
    pub total_odds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_odds_display: Option<String>,
    #[serde(default)]
    pub legs: Vec<LegPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegPayload {
    pub fixture_id: u64,
    pub market: String,
    pub pick: String,
    pub odds: f64,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub home: String,
    #[serde(default)]
    pub away: String,
    /// Kickoff in the run's display zone, "YYYY-MM-DD HH:MM".
    #[serde(default, alias = "kickoff")]
    pub kickoff_local: String,
}

impl TicketPayload {
    pub fn from_outcome(date: &str, outcome: &TicketOutcome) -> Self {
        let Some(ticket) = outcome.ticket.as_ref() else {
            return Self {
                date: date.to_string(),
                target_odds: outcome.target_odds,
                total_odds: None,
                total_odds_display: None,
                legs: Vec::new(),
            };
        };
        let total = ticket.total_odds();
        Self {
            date: date.to_string(),
            target_odds: outcome.target_odds,
            total_odds: Some(total),
            total_odds_display: Some(format!("{total:.2}")),
            legs: ticket
                .legs
                .iter()
                .map(|leg| LegPayload {
                    fixture_id: leg.fixture_id,
                    market: leg.selection.market().label().to_string(),
                    pick: leg.selection.pick_label(),
                    odds: leg.odds,
                    country: leg.country.clone(),
                    league: leg.league.clone(),
                    home: leg.home.clone(),
                    away: leg.away.clone(),
                    kickoff_local: leg.kickoff.clone(),
                })
                .collect(),
        }
    }
}

/// A ticket read back for grading. Older files used different key names, so
/// this is decoded leniently from raw JSON rather than derived.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredTicket {
    pub date: Option<String>,
    pub target_odds: Option<f64>,
    pub total_odds: Option<f64>,
    pub legs: Vec<StoredLeg>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredLeg {
    /// `None` when the id was missing or not a positive integer.
    pub fixture_id: Option<u64>,
    pub market: String,
    pub pick: String,
    pub odds: Option<f64>,
}

pub fn parse_stored_ticket_json(raw: &str) -> Result<StoredTicket> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(StoredTicket::default());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid ticket json")?;
    Ok(stored_ticket_from_value(&root))
}

pub fn stored_ticket_from_value(root: &Value) -> StoredTicket {
    let base = match root.get("ticket") {
        Some(inner) if inner.is_object() => inner,
        _ => root,
    };

    let date = pick_string(root, &["date"]).or_else(|| pick_string(base, &["date"]));
    let target_odds = pick_f64(root, &["target_odds", "target"])
        .or_else(|| pick_f64(base, &["target_odds", "target"]));
    let total_odds =
        pick_f64(root, &["total_odds"]).or_else(|| pick_f64(base, &["total_odds"]));

    let legs = base
        .get("legs")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter(|leg| leg.is_object())
                .map(stored_leg_from_value)
                .collect()
        })
        .unwrap_or_default();

    StoredTicket {
        date,
        target_odds,
        total_odds,
        legs,
    }
}

fn stored_leg_from_value(leg: &Value) -> StoredLeg {
    StoredLeg {
        fixture_id: pick_id(leg, &["fixture_id", "fid", "fixtureId", "fixtureID"]),
        market: pick_string(leg, &["market", "market_name", "market_display"]).unwrap_or_default(),
        pick: pick_string(leg, &["pick", "pick_name", "selection", "value"]).unwrap_or_default(),
        odds: pick_f64(leg, &["odds", "odd"]),
    }
}

/// Evaluation file written per ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub date: Option<String>,
    pub target_odds: Option<f64>,
    pub total_odds: Option<f64>,
    pub ticket_result: Verdict,
    pub wins: usize,
    pub loses: usize,
    pub pendings: usize,
    pub legs: Vec<LegEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegEvaluation {
    pub fixture_id: Option<u64>,
    pub market: String,
    pub pick: String,
    pub result: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_ft: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_ht: Option<String>,
}

fn pick_string(v: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match v.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn pick_f64(v: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let parsed = match v.get(*key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(x) = parsed.filter(|x| x.is_finite()) {
            return Some(x);
        }
    }
    None
}

/// First present key wins; a present but malformed id yields `None` instead
/// of falling through to the next alias.
fn pick_id(v: &Value, keys: &[&str]) -> Option<u64> {
    let raw = keys.iter().find_map(|key| v.get(*key))?;
    let id = match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}
