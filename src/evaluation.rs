use std::collections::HashMap;

use crate::grading::{FinalStatuses, FixtureResult, Verdict, grade_leg};
use crate::payload::{EvaluationPayload, LegEvaluation, StoredTicket};

/// Folds leg verdicts: any loss loses the ticket, otherwise any pending leg
/// keeps it pending. An empty ticket is pending.
pub fn aggregate(verdicts: &[Verdict]) -> Verdict {
    if verdicts.is_empty() {
        return Verdict::Pending;
    }
    let mut pending = false;
    for verdict in verdicts {
        match verdict {
            Verdict::Lose => return Verdict::Lose,
            Verdict::Pending => pending = true,
            Verdict::Win => {}
        }
    }
    if pending {
        Verdict::Pending
    } else {
        Verdict::Win
    }
}

pub fn evaluate_ticket(
    name: Option<&str>,
    ticket: &StoredTicket,
    results: &HashMap<u64, FixtureResult>,
    finals: &FinalStatuses,
) -> EvaluationPayload {
    let legs: Vec<LegEvaluation> = ticket
        .legs
        .iter()
        .map(|leg| {
            // Legs without a usable id never find a result and stay pending.
            let result = leg.fixture_id.and_then(|id| results.get(&id));
            let grade = grade_leg(&leg.market, &leg.pick, result, finals);
            LegEvaluation {
                fixture_id: leg.fixture_id,
                market: leg.market.clone(),
                pick: leg.pick.clone(),
                result: grade.result,
                score_ft: grade.score_ft,
                score_ht: grade.score_ht,
            }
        })
        .collect();

    let verdicts: Vec<Verdict> = legs.iter().map(|leg| leg.result).collect();
    let count = |v: Verdict| verdicts.iter().filter(|x| **x == v).count();

    EvaluationPayload {
        name: name.map(str::to_string),
        date: ticket.date.clone(),
        target_odds: ticket.target_odds,
        total_odds: ticket.total_odds,
        ticket_result: aggregate(&verdicts),
        wins: count(Verdict::Win),
        loses: count(Verdict::Lose),
        pendings: count(Verdict::Pending),
        legs,
    }
}
