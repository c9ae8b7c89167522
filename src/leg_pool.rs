use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::market::Selection;
use crate::thresholds::ThresholdTable;

pub const MIN_VALID_ODDS: f64 = 1.01;
pub const HEAVY_FAVORITE_BELOW: f64 = 1.20;
const UNKNOWN_COUNTRY: &str = "World";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureInfo {
    pub fixture_id: u64,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub home: String,
    #[serde(default)]
    pub away: String,
    #[serde(default)]
    pub kickoff: String,
}

/// Best known odds per selection for one fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureOdds {
    pub fixture: FixtureInfo,
    #[serde(default)]
    pub odds: BTreeMap<Selection, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub fixture_id: u64,
    pub selection: Selection,
    pub odds: f64,
    pub country: String,
    pub league: String,
    pub home: String,
    pub away: String,
    pub kickoff: String,
}

impl Leg {
    pub fn is_heavy_favorite(&self) -> bool {
        self.odds < HEAVY_FAVORITE_BELOW
    }

    pub fn from_fixture(fixture: &FixtureInfo, selection: Selection, odds: f64) -> Self {
        let country = fixture.country.trim();
        Self {
            fixture_id: fixture.fixture_id,
            selection,
            odds,
            country: if country.is_empty() {
                UNKNOWN_COUNTRY.to_string()
            } else {
                country.to_string()
            },
            league: fixture.league.clone(),
            home: fixture.home.clone(),
            away: fixture.away.clone(),
            kickoff: fixture.kickoff.clone(),
        }
    }
}

pub fn is_valid_odds(odds: f64) -> bool {
    odds.is_finite() && odds >= MIN_VALID_ODDS
}

/// One leg per fixture: the highest-odds selection that stays strictly below
/// its cap. Fixtures listed more than once are merged first, keeping the best
/// price per selection.
pub fn build_leg_pool(fixtures: &[FixtureOdds], caps: &ThresholdTable) -> Vec<Leg> {
    let mut order: Vec<u64> = Vec::new();
    let mut merged: HashMap<u64, (&FixtureInfo, BTreeMap<Selection, f64>)> = HashMap::new();

    for item in fixtures {
        let id = item.fixture.fixture_id;
        let entry = merged.entry(id).or_insert_with(|| {
            order.push(id);
            (&item.fixture, BTreeMap::new())
        });
        for (sel, odds) in &item.odds {
            if !is_valid_odds(*odds) {
                continue;
            }
            let best = entry.1.entry(*sel).or_insert(*odds);
            if *odds > *best {
                *best = *odds;
            }
        }
    }

    let mut pool = Vec::new();
    for id in order {
        let Some((fixture, odds)) = merged.get(&id) else {
            continue;
        };
        if let Some((sel, price)) = best_under_cap(odds, caps) {
            pool.push(Leg::from_fixture(fixture, sel, price));
        }
    }
    pool
}

fn best_under_cap(
    odds: &BTreeMap<Selection, f64>,
    caps: &ThresholdTable,
) -> Option<(Selection, f64)> {
    let mut best: Option<(Selection, f64)> = None;
    for (sel, price) in odds {
        let Some(cap) = caps.cap(sel) else {
            continue;
        };
        if *price >= cap {
            continue;
        }
        // Strict comparison keeps the first selection in catalogue order on ties.
        if best.is_none_or(|(_, current)| *price > current) {
            best = Some((*sel, *price));
        }
    }
    best
}
