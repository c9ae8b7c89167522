use std::collections::BTreeMap;

use crate::market::{Line, Market, Outcome, Selection};

/// Maximum acceptable odds per selection. Selections without a cap are not
/// eligible at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    caps: BTreeMap<Selection, f64>,
}

const BASELINE: &[(Market, Outcome, f64)] = &[
    (Market::DoubleChance, Outcome::HomeOrDraw, 1.20),
    (Market::DoubleChance, Outcome::DrawOrAway, 1.25),
    (Market::DoubleChance, Outcome::HomeOrAway, 1.32),
    (Market::Btts, Outcome::Yes, 1.60),
    (Market::Btts, Outcome::No, 1.60),
    (Market::MatchWinner, Outcome::Home, 1.44),
    (Market::MatchWinner, Outcome::Away, 1.60),
];

const BASELINE_LINES: &[(Market, bool, u16, f64)] = &[
    (Market::OverUnder, true, 15, 1.22),
    (Market::OverUnder, true, 20, 1.35),
    (Market::OverUnder, true, 25, 1.55),
    (Market::OverUnder, false, 35, 1.30),
    (Market::FirstHalfGoals, true, 5, 1.28),
    (Market::FirstHalfGoals, true, 10, 1.52),
    (Market::HomeTeamGoals, true, 5, 1.25),
    (Market::AwayTeamGoals, true, 5, 1.35),
];

impl ThresholdTable {
    pub fn empty() -> Self {
        Self {
            caps: BTreeMap::new(),
        }
    }

    pub fn baseline() -> Self {
        let lines = BASELINE_LINES.iter().map(|(market, over, tenths, cap)| {
            let line = Line::from_tenths(*tenths);
            let outcome = if *over {
                Outcome::Over(line)
            } else {
                Outcome::Under(line)
            };
            (*market, outcome, *cap)
        });
        BASELINE
            .iter()
            .copied()
            .chain(lines)
            .filter_map(|(market, outcome, cap)| Some((Selection::new(market, outcome)?, cap)))
            .fold(Self::empty(), |table, (sel, cap)| table.with_cap(sel, cap))
    }

    /// Adds or replaces the cap for `selection`. Non-finite or non-positive
    /// caps are ignored.
    pub fn with_cap(mut self, selection: Selection, cap: f64) -> Self {
        if cap.is_finite() && cap > 0.0 {
            self.caps.insert(selection, cap);
        }
        self
    }

    pub fn cap(&self, selection: &Selection) -> Option<f64> {
        self.caps.get(selection).copied()
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    /// Copy of the table with every cap raised by `step`. Caps never go down,
    /// so a non-positive step returns the table unchanged.
    pub fn relaxed(&self, step: f64) -> Self {
        if !step.is_finite() || step <= 0.0 {
            return self.clone();
        }
        Self {
            caps: self
                .caps
                .iter()
                .map(|(sel, cap)| (*sel, cap + step))
                .collect(),
        }
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::baseline()
    }
}
