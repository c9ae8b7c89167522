use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::leg_pool::{FixtureOdds, Leg, build_leg_pool, is_valid_odds};
use crate::thresholds::ThresholdTable;

/// Default bound on frames popped by the fallback search for one ticket.
pub const MAX_SEARCH_NODES: usize = 250_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyRules {
    pub legs_min: usize,
    pub legs_max: usize,
    pub max_per_country: usize,
    pub max_heavy_favorites: usize,
    /// Candidates considered at each depth of the fallback search.
    pub lookahead: usize,
    /// Frames the fallback search may pop before giving up on a target.
    pub max_search_nodes: usize,
}

impl Default for AssemblyRules {
    fn default() -> Self {
        Self {
            legs_min: 3,
            legs_max: 7,
            max_per_country: 2,
            max_heavy_favorites: 1,
            lookahead: 24,
            max_search_nodes: MAX_SEARCH_NODES,
        }
    }
}

impl AssemblyRules {
    pub fn is_valid(&self) -> bool {
        self.legs_min >= 1 && self.legs_min <= self.legs_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxationPolicy {
    /// Extra rounds after the baseline attempt.
    pub rounds: u32,
    /// Added to every cap per round.
    pub step: f64,
}

impl Default for RelaxationPolicy {
    fn default() -> Self {
        Self {
            rounds: 2,
            step: 0.03,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub target_odds: f64,
    pub legs: Vec<Leg>,
}

impl Ticket {
    pub fn total_odds(&self) -> f64 {
        self.legs.iter().map(|leg| leg.odds).product()
    }

    pub fn fixture_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.legs.iter().map(|leg| leg.fixture_id)
    }
}

/// Result of assembling one target. `ticket` is `None` when no ticket met the
/// constraints even after the last relaxation round.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketOutcome {
    pub target_odds: f64,
    pub ticket: Option<Ticket>,
    /// Relaxation round that produced the ticket (0 = baseline caps).
    pub round: Option<u32>,
}

/// Builds one ticket from `pool`, skipping fixtures in `used`.
///
/// Candidates are ordered by odds descending, then fixture id ascending, then
/// selection catalogue order. The greedy walk admits legs in that order; if it
/// falls short of the target a depth-bounded search over a sliding window of
/// candidates takes over.
pub fn assemble_ticket(
    pool: &[Leg],
    target: f64,
    rules: &AssemblyRules,
    used: &HashSet<u64>,
) -> Option<Ticket> {
    if !rules.is_valid() || !target.is_finite() || target <= 0.0 {
        return None;
    }

    let mut candidates: Vec<&Leg> = pool
        .iter()
        .filter(|leg| is_valid_odds(leg.odds) && !used.contains(&leg.fixture_id))
        .collect();
    candidates.sort_by(|a, b| compare_candidates(a, b));

    if let Some(legs) = greedy(&candidates, target, rules) {
        return Some(make_ticket(target, legs));
    }
    debug!(
        target_odds = target,
        candidates = candidates.len(),
        "greedy pass fell short, running bounded search"
    );
    bounded_search(&candidates, target, rules).map(|legs| make_ticket(target, legs))
}

fn compare_candidates(a: &Leg, b: &Leg) -> Ordering {
    b.odds
        .total_cmp(&a.odds)
        .then(a.fixture_id.cmp(&b.fixture_id))
        .then(a.selection.cmp(&b.selection))
}

fn make_ticket(target: f64, legs: Vec<&Leg>) -> Ticket {
    Ticket {
        target_odds: target,
        legs: legs.into_iter().cloned().collect(),
    }
}

fn is_complete(len: usize, product: f64, target: f64, rules: &AssemblyRules) -> bool {
    len >= rules.legs_min && len <= rules.legs_max && product >= target
}

/// Diversity predicate: no repeated fixture, no country above its quota, no
/// more heavy favorites than allowed.
pub fn admits(chosen: &[&Leg], candidate: &Leg, rules: &AssemblyRules) -> bool {
    let mut same_country = 0usize;
    let mut heavy = usize::from(candidate.is_heavy_favorite());
    for leg in chosen {
        if leg.fixture_id == candidate.fixture_id {
            return false;
        }
        if leg.country == candidate.country {
            same_country += 1;
        }
        if leg.is_heavy_favorite() {
            heavy += 1;
        }
    }
    same_country < rules.max_per_country && heavy <= rules.max_heavy_favorites
}

fn greedy<'a>(candidates: &[&'a Leg], target: f64, rules: &AssemblyRules) -> Option<Vec<&'a Leg>> {
    let mut chosen: Vec<&'a Leg> = Vec::new();
    let mut product = 1.0;
    for &candidate in candidates {
        if chosen.len() >= rules.legs_max {
            break;
        }
        if !admits(&chosen, candidate, rules) {
            continue;
        }
        chosen.push(candidate);
        product *= candidate.odds;
        if is_complete(chosen.len(), product, target, rules) {
            return Some(chosen);
        }
    }
    None
}

struct Frame {
    next: usize,
    chosen: Vec<usize>,
    product: f64,
}

/// Explicit work stack of `(next candidate, partial ticket, product)` frames.
/// Depth is bounded by `legs_max`, branching by `lookahead`, and the total
/// work by `max_search_nodes`.
fn bounded_search<'a>(
    candidates: &[&'a Leg],
    target: f64,
    rules: &AssemblyRules,
) -> Option<Vec<&'a Leg>> {
    let lookahead = rules.lookahead.max(1);
    let mut stack = vec![Frame {
        next: 0,
        chosen: Vec::new(),
        product: 1.0,
    }];
    let mut expanded = 0usize;

    while let Some(frame) = stack.pop() {
        expanded += 1;
        if expanded > rules.max_search_nodes {
            warn!(
                target_odds = target,
                budget = rules.max_search_nodes,
                "search budget exhausted"
            );
            return None;
        }
        if frame.chosen.len() >= rules.legs_max {
            continue;
        }
        let remaining = rules.legs_max - frame.chosen.len();
        let partial: Vec<&Leg> = frame.chosen.iter().map(|idx| candidates[*idx]).collect();
        let window_end = frame.next.saturating_add(lookahead).min(candidates.len());

        let mut children = Vec::new();
        for idx in frame.next..window_end {
            // Odds are sorted descending, so once the best completion from
            // here misses the target every later index misses it too.
            if frame.product * best_completion(candidates, idx, remaining) < target {
                break;
            }
            let candidate = candidates[idx];
            if !admits(&partial, candidate, rules) {
                continue;
            }
            let product = frame.product * candidate.odds;
            let mut chosen = frame.chosen.clone();
            chosen.push(idx);
            if is_complete(chosen.len(), product, target, rules) {
                debug!(target_odds = target, expanded, "bounded search found a ticket");
                return Some(chosen.iter().map(|i| candidates[*i]).collect());
            }
            children.push(Frame {
                next: idx + 1,
                chosen,
                product,
            });
        }
        // Highest-odds child is explored first.
        stack.extend(children.into_iter().rev());
    }
    None
}

fn best_completion(candidates: &[&Leg], from: usize, slots: usize) -> f64 {
    candidates
        .iter()
        .skip(from)
        .take(slots)
        .map(|leg| leg.odds)
        .product()
}

/// Tries the baseline caps first, then `relax.rounds` progressively relaxed
/// tables, rebuilding the pool from `fixtures` every round.
pub fn assemble_with_relaxation(
    fixtures: &[FixtureOdds],
    baseline: &ThresholdTable,
    target: f64,
    rules: &AssemblyRules,
    relax: &RelaxationPolicy,
    used: &HashSet<u64>,
) -> Option<(Ticket, u32)> {
    for round in 0..=relax.rounds {
        let caps = baseline.relaxed(relax.step * f64::from(round));
        let pool = build_leg_pool(fixtures, &caps);
        debug!(
            target_odds = target,
            round,
            caps = caps.len(),
            pool = pool.len(),
            "assembling ticket"
        );
        if pool.is_empty() {
            continue;
        }
        if let Some(ticket) = assemble_ticket(&pool, target, rules, used) {
            return Some((ticket, round));
        }
    }
    None
}

/// One outcome per target, in the order given. Fixtures used by a successful
/// ticket are not offered to later targets; a failed target excludes nothing.
pub fn build_daily_tickets(
    fixtures: &[FixtureOdds],
    baseline: &ThresholdTable,
    targets: &[f64],
    rules: &AssemblyRules,
    relax: &RelaxationPolicy,
) -> Vec<TicketOutcome> {
    if baseline.is_empty() {
        warn!("threshold table has no caps, every target will fail");
    }
    let mut used: HashSet<u64> = HashSet::new();
    let mut outcomes = Vec::with_capacity(targets.len());

    for &target in targets {
        match assemble_with_relaxation(fixtures, baseline, target, rules, relax, &used) {
            Some((ticket, round)) => {
                info!(
                    target_odds = target,
                    round,
                    legs = ticket.legs.len(),
                    total_odds = ticket.total_odds(),
                    "ticket assembled"
                );
                used.extend(ticket.fixture_ids());
                outcomes.push(TicketOutcome {
                    target_odds: target,
                    ticket: Some(ticket),
                    round: Some(round),
                });
            }
            None => {
                warn!(target_odds = target, rounds = relax.rounds, "no feasible ticket");
                outcomes.push(TicketOutcome {
                    target_odds: target,
                    ticket: None,
                    round: None,
                });
            }
        }
    }
    outcomes
}
