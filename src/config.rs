use std::env;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::assembler::{AssemblyRules, RelaxationPolicy};
use crate::grading::FinalStatuses;

const DEFAULT_TARGETS: &[f64] = &[2.0, 3.0, 4.0];
const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Belgrade;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub targets: Vec<f64>,
    pub rules: AssemblyRules,
    pub relax: RelaxationPolicy,
    pub finals: FinalStatuses,
    pub public_dir: PathBuf,
    /// Zone for kickoff display and the default run date.
    pub timezone: Tz,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            targets: DEFAULT_TARGETS.to_vec(),
            rules: AssemblyRules::default(),
            relax: RelaxationPolicy::default(),
            finals: FinalStatuses::default(),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            timezone: DEFAULT_TIMEZONE,
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let targets = env::var("TICKET_TARGETS")
            .ok()
            .map(|raw| parse_targets(&raw))
            .filter(|t| !t.is_empty())
            .unwrap_or(defaults.targets);

        let legs_min = env_usize("LEGS_MIN", defaults.rules.legs_min).clamp(1, 20);
        let legs_max = env_usize("LEGS_MAX", defaults.rules.legs_max).clamp(legs_min, 20);
        let rules = AssemblyRules {
            legs_min,
            legs_max,
            max_per_country: env_usize("MAX_PER_COUNTRY", defaults.rules.max_per_country)
                .clamp(1, 20),
            max_heavy_favorites: env_usize(
                "MAX_HEAVY_FAVORITES",
                defaults.rules.max_heavy_favorites,
            )
            .min(20),
            lookahead: env_usize("SEARCH_LOOKAHEAD", defaults.rules.lookahead).clamp(1, 64),
            max_search_nodes: env_usize("SEARCH_NODE_BUDGET", defaults.rules.max_search_nodes)
                .clamp(1, 5_000_000),
        };

        let relax = RelaxationPolicy {
            rounds: env_usize("RELAX_STEPS", defaults.relax.rounds as usize).min(20) as u32,
            step: env::var("RELAX_ADD")
                .ok()
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(defaults.relax.step)
                .min(1.0),
        };

        let finals = env::var("FINAL_STATUS_CODES")
            .ok()
            .map(|raw| FinalStatuses::new(raw.split([',', ';', ' '])))
            .filter(|f| !f.is_empty())
            .unwrap_or(defaults.finals);

        let public_dir = env::var("PUBLIC_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.public_dir);

        Self {
            targets,
            rules,
            relax,
            finals,
            public_dir,
            timezone: timezone_from_env(),
        }
    }
}

/// Targets in the order given. A repeated target would overwrite the same
/// ticket file, so only its first occurrence is kept.
pub fn parse_targets(raw: &str) -> Vec<f64> {
    let mut targets: Vec<f64> = Vec::new();
    for target in raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<f64>().ok())
        .filter(|t| t.is_finite() && *t > 1.0)
    {
        if targets.contains(&target) {
            warn!(target_odds = target, "duplicate ticket target ignored");
            continue;
        }
        targets.push(target);
    }
    targets
}

/// `TIMEZONE` as an IANA name; unknown names fall back to the default zone.
pub fn timezone_from_env() -> Tz {
    match env::var("TIMEZONE") {
        Ok(raw) if !raw.trim().is_empty() => parse_timezone(&raw).unwrap_or_else(|| {
            warn!(timezone = raw.trim(), fallback = %DEFAULT_TIMEZONE, "unknown timezone");
            DEFAULT_TIMEZONE
        }),
        _ => DEFAULT_TIMEZONE,
    }
}

pub fn parse_timezone(raw: &str) -> Option<Tz> {
    raw.trim().parse::<Tz>().ok()
}

/// Calendar date of `now` in `tz`, formatted `YYYY-MM-DD`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

pub(crate) fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}
