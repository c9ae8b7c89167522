use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::market::{Line, Market, Outcome, Selection};

/// Absorbs float rounding on fractional goal lines.
const LINE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Win,
    Lose,
    Pending,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Win => "win",
            Verdict::Lose => "lose",
            Verdict::Pending => "pending",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status and goals for one fixture as reported by the results source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureResult {
    pub fixture_id: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub goals_home: Option<u32>,
    #[serde(default)]
    pub goals_away: Option<u32>,
    #[serde(default)]
    pub ht_home: Option<u32>,
    #[serde(default)]
    pub ht_away: Option<u32>,
}

impl FixtureResult {
    pub fn full_time(&self) -> Option<(u32, u32)> {
        Some((self.goals_home?, self.goals_away?))
    }

    pub fn half_time(&self) -> Option<(u32, u32)> {
        Some((self.ht_home?, self.ht_away?))
    }
}

/// Status codes that mean the match is over and can be graded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStatuses {
    codes: HashSet<String>,
}

impl FinalStatuses {
    pub const DEFAULT_CODES: [&'static str; 3] = ["FT", "AET", "PEN"];

    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        Self { codes }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn is_final(&self, status: &str) -> bool {
        self.codes.contains(&status.trim().to_ascii_uppercase())
    }
}

impl Default for FinalStatuses {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CODES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub home: u32,
    pub away: u32,
    pub half_time: Option<(u32, u32)>,
}

/// Whether `selection` won given the final score. `None` only when the market
/// needs a half-time score that is not available.
pub fn selection_hits(selection: &Selection, score: Score) -> Option<bool> {
    // Widened so corrupt goal counts cannot overflow the totals.
    let (home, away) = (u64::from(score.home), u64::from(score.away));
    let outcome = selection.outcome();
    let hit = match selection.market() {
        Market::MatchWinner => match outcome {
            Outcome::Home => home > away,
            Outcome::Away => away > home,
            Outcome::Draw => home == away,
            _ => false,
        },
        Market::DoubleChance => match outcome {
            Outcome::HomeOrDraw => home >= away,
            Outcome::DrawOrAway => away >= home,
            Outcome::HomeOrAway => home != away,
            _ => false,
        },
        Market::Btts => {
            let both = home > 0 && away > 0;
            match outcome {
                Outcome::Yes => both,
                Outcome::No => !both,
                _ => false,
            }
        }
        Market::OverUnder => line_hits(outcome, home + away),
        Market::HomeTeamGoals => line_hits(outcome, home),
        Market::AwayTeamGoals => line_hits(outcome, away),
        Market::FirstHalfGoals => {
            let (ht_home, ht_away) = score.half_time?;
            match outcome {
                Outcome::Over(line) => over(line, u64::from(ht_home) + u64::from(ht_away)),
                _ => false,
            }
        }
    };
    Some(hit)
}

fn line_hits(outcome: Outcome, goals: u64) -> bool {
    match outcome {
        Outcome::Over(line) => over(line, goals),
        Outcome::Under(line) => (goals as f64) < line.goals() + LINE_EPSILON,
        _ => false,
    }
}

fn over(line: Line, goals: u64) -> bool {
    goals as f64 > line.goals() - LINE_EPSILON
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegGrade {
    pub result: Verdict,
    pub score_ft: Option<String>,
    pub score_ht: Option<String>,
}

impl LegGrade {
    fn pending() -> Self {
        Self {
            result: Verdict::Pending,
            score_ft: None,
            score_ht: None,
        }
    }
}

/// Grades a stored leg by its market and pick labels.
///
/// Pending until the status is final and full-time goals are known. After
/// that, labels outside the catalogue grade as a loss.
pub fn grade_leg(
    market: &str,
    pick: &str,
    result: Option<&FixtureResult>,
    finals: &FinalStatuses,
) -> LegGrade {
    let Some(result) = result else {
        return LegGrade::pending();
    };
    if !finals.is_final(&result.status) {
        return LegGrade::pending();
    }
    let Some((home, away)) = result.full_time() else {
        return LegGrade::pending();
    };
    let half_time = result.half_time();
    let score = Score {
        home,
        away,
        half_time,
    };

    let verdict = match Selection::parse(market, pick) {
        Some(selection) => match selection_hits(&selection, score) {
            Some(true) => Verdict::Win,
            Some(false) => Verdict::Lose,
            None => return LegGrade::pending(),
        },
        None => Verdict::Lose,
    };

    LegGrade {
        result: verdict,
        score_ft: Some(format!("{home}-{away}")),
        score_ht: half_time.map(|(h, a)| format!("{h}-{a}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{FinalStatuses, FixtureResult, Verdict, grade_leg};

    fn result(status: &str, ft: Option<(u32, u32)>, ht: Option<(u32, u32)>) -> FixtureResult {
        FixtureResult {
            fixture_id: 1,
            status: status.to_string(),
            goals_home: ft.map(|s| s.0),
            goals_away: ft.map(|s| s.1),
            ht_home: ht.map(|s| s.0),
            ht_away: ht.map(|s| s.1),
        }
    }

    #[test]
    fn final_status_match_is_case_insensitive() {
        let finals = FinalStatuses::default();
        assert!(finals.is_final("ft"));
        assert!(finals.is_final(" PEN "));
        assert!(!finals.is_final("WO"));
        assert!(FinalStatuses::new(["FT", "WO"]).is_final("wo"));
    }

    #[test]
    fn live_status_stays_pending_with_partial_goals() {
        let r = result("2H", Some((3, 0)), Some((1, 0)));
        let grade = grade_leg("Match Winner", "Home", Some(&r), &FinalStatuses::default());
        assert_eq!(grade.result, Verdict::Pending);
        assert!(grade.score_ft.is_none());
    }

    #[test]
    fn final_without_goals_is_pending() {
        let r = result("FT", None, None);
        let grade = grade_leg("BTTS", "No", Some(&r), &FinalStatuses::default());
        assert_eq!(grade.result, Verdict::Pending);
    }

    #[test]
    fn first_half_needs_half_time_score() {
        let finals = FinalStatuses::default();
        let without = result("FT", Some((2, 1)), None);
        assert_eq!(
            grade_leg("1st Half Goals", "Over 0.5", Some(&without), &finals).result,
            Verdict::Pending
        );
        let with = result("FT", Some((2, 1)), Some((1, 0)));
        let grade = grade_leg("1st Half Goals", "O0.5", Some(&with), &finals);
        assert_eq!(grade.result, Verdict::Win);
        assert_eq!(grade.score_ht.as_deref(), Some("1-0"));
    }

    #[test]
    fn unknown_market_loses_once_final() {
        let r = result("FT", Some((1, 0)), None);
        let grade = grade_leg("Corners", "Over 9.5", Some(&r), &FinalStatuses::default());
        assert_eq!(grade.result, Verdict::Lose);
        assert_eq!(grade.score_ft.as_deref(), Some("1-0"));
    }

    #[test]
    fn team_goal_lines_use_one_side() {
        let finals = FinalStatuses::default();
        let r = result("AET", Some((0, 2)), None);
        assert_eq!(
            grade_leg("Home Team Goals", "Over 0.5", Some(&r), &finals).result,
            Verdict::Lose
        );
        assert_eq!(
            grade_leg("Away Team Goals", "Over 1.5", Some(&r), &finals).result,
            Verdict::Win
        );
    }

    #[test]
    fn oversized_goal_counts_grade_without_overflow() {
        let finals = FinalStatuses::default();
        let r = result("FT", Some((u32::MAX, 1)), Some((u32::MAX, u32::MAX)));
        assert_eq!(
            grade_leg("Over/Under", "Over 2.5", Some(&r), &finals).result,
            Verdict::Win
        );
        assert_eq!(
            grade_leg("Over/Under", "Under 3.5", Some(&r), &finals).result,
            Verdict::Lose
        );
        assert_eq!(
            grade_leg("1st Half Goals", "Over 1.0", Some(&r), &finals).result,
            Verdict::Win
        );
    }
}
