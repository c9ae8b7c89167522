use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Markets a leg can be placed on. Anything a provider offers outside this
/// list never enters the pool and grades as a loss if it shows up in a
/// stored ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Market {
    MatchWinner,
    DoubleChance,
    Btts,
    OverUnder,
    FirstHalfGoals,
    HomeTeamGoals,
    AwayTeamGoals,
}

impl Market {
    pub const ALL: [Market; 7] = [
        Market::MatchWinner,
        Market::DoubleChance,
        Market::Btts,
        Market::OverUnder,
        Market::FirstHalfGoals,
        Market::HomeTeamGoals,
        Market::AwayTeamGoals,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Market::MatchWinner => "Match Winner",
            Market::DoubleChance => "Double Chance",
            Market::Btts => "BTTS",
            Market::OverUnder => "Over/Under",
            Market::FirstHalfGoals => "1st Half Goals",
            Market::HomeTeamGoals => "Home Team Goals",
            Market::AwayTeamGoals => "Away Team Goals",
        }
    }

    pub fn parse(raw: &str) -> Option<Market> {
        let key = normalize_label(raw);
        let market = match key.as_str() {
            "matchwinner" | "1x2" | "fulltimeresult" => Market::MatchWinner,
            "doublechance" => Market::DoubleChance,
            "btts" | "bothteamsscore" | "bothteamstoscore" => Market::Btts,
            "overunder" | "goalsoverunder" => Market::OverUnder,
            "1sthalfgoals" | "firsthalfgoals" | "goalsoverunderfirsthalf" => {
                Market::FirstHalfGoals
            }
            "hometeamgoals" | "totalhome" => Market::HomeTeamGoals,
            "awayteamgoals" | "totalaway" => Market::AwayTeamGoals,
            _ => return None,
        };
        Some(market)
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A goal line in tenths of a goal (2.5 is stored as 25).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Line(u16);

impl Line {
    pub fn from_tenths(tenths: u16) -> Self {
        Self(tenths)
    }

    pub fn goals(self) -> f64 {
        f64::from(self.0) / 10.0
    }

    pub fn parse(raw: &str) -> Option<Line> {
        let value = raw.trim().parse::<f64>().ok()?;
        if !value.is_finite() || value < 0.0 || value > 100.0 {
            return None;
        }
        let tenths = (value * 10.0).round();
        // Quarter lines (2.25) do not fit the catalogue.
        if (tenths / 10.0 - value).abs() > 1e-6 {
            return None;
        }
        Some(Line(tenths as u16))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    Home,
    Draw,
    Away,
    HomeOrDraw,
    DrawOrAway,
    HomeOrAway,
    Yes,
    No,
    Over(Line),
    Under(Line),
}

impl Outcome {
    pub fn label(self) -> String {
        match self {
            Outcome::Home => "Home".to_string(),
            Outcome::Draw => "Draw".to_string(),
            Outcome::Away => "Away".to_string(),
            Outcome::HomeOrDraw => "1X".to_string(),
            Outcome::DrawOrAway => "X2".to_string(),
            Outcome::HomeOrAway => "12".to_string(),
            Outcome::Yes => "Yes".to_string(),
            Outcome::No => "No".to_string(),
            Outcome::Over(line) => format!("Over {line}"),
            Outcome::Under(line) => format!("Under {line}"),
        }
    }

    /// Accepts "Home", "1X", "Yes", "Over 2.5", "Under 3.5" and the compact
    /// "O2.5" / "U3.5" forms older payloads carry.
    pub fn parse(raw: &str) -> Option<Outcome> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        let outcome = match lower.as_str() {
            "home" | "1" => Outcome::Home,
            "draw" | "x" => Outcome::Draw,
            "away" | "2" => Outcome::Away,
            "1x" | "home/draw" => Outcome::HomeOrDraw,
            "x2" | "draw/away" => Outcome::DrawOrAway,
            "12" | "home/away" => Outcome::HomeOrAway,
            "yes" => Outcome::Yes,
            "no" => Outcome::No,
            _ => {
                if let Some(rest) = lower.strip_prefix("over") {
                    return Line::parse(rest).map(Outcome::Over);
                }
                if let Some(rest) = lower.strip_prefix("under") {
                    return Line::parse(rest).map(Outcome::Under);
                }
                if let Some(rest) = lower.strip_prefix('o') {
                    return Line::parse(rest).map(Outcome::Over);
                }
                if let Some(rest) = lower.strip_prefix('u') {
                    return Line::parse(rest).map(Outcome::Under);
                }
                return None;
            }
        };
        Some(outcome)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A (market, outcome) pair that is legal under the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selection {
    market: Market,
    outcome: Outcome,
}

impl Selection {
    pub fn new(market: Market, outcome: Outcome) -> Option<Selection> {
        let legal = match market {
            Market::MatchWinner => {
                matches!(outcome, Outcome::Home | Outcome::Draw | Outcome::Away)
            }
            Market::DoubleChance => matches!(
                outcome,
                Outcome::HomeOrDraw | Outcome::DrawOrAway | Outcome::HomeOrAway
            ),
            Market::Btts => matches!(outcome, Outcome::Yes | Outcome::No),
            Market::OverUnder | Market::HomeTeamGoals | Market::AwayTeamGoals => {
                matches!(outcome, Outcome::Over(_) | Outcome::Under(_))
            }
            Market::FirstHalfGoals => matches!(outcome, Outcome::Over(_)),
        };
        legal.then_some(Selection { market, outcome })
    }

    pub fn parse(market: &str, outcome: &str) -> Option<Selection> {
        let market = Market::parse(market)?;
        let outcome = Outcome::parse(outcome)?;
        Selection::new(market, outcome)
    }

    pub fn market(&self) -> Market {
        self.market
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn pick_label(&self) -> String {
        self.outcome.label()
    }

    /// Stable string key, `"<market label>|<pick label>"`, used when a
    /// selection has to live in a JSON object key.
    pub fn key(&self) -> String {
        format!("{}|{}", self.market.label(), self.outcome.label())
    }

    pub fn from_key(raw: &str) -> Option<Selection> {
        let (market, outcome) = raw.split_once('|')?;
        Selection::parse(market, outcome)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.market, self.outcome)
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Selection::from_key(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown selection {raw:?}")))
    }
}

fn normalize_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
