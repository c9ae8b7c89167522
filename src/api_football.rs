use std::collections::{BTreeMap, HashMap, HashSet};
use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::DateTime;
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{env_usize, timezone_from_env};
use crate::grading::FixtureResult;
use crate::leg_pool::{FixtureInfo, FixtureOdds, is_valid_odds};
use crate::market::{Market, Outcome, Selection};

const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";
const DEFAULT_RETRIES: usize = 6;
const DEFAULT_BACKOFF_MS: u64 = 1200;
const BACKOFF_FACTOR: f64 = 1.7;
const DEFAULT_TIMEOUT_SECS: u64 = 20;

// One connection pool per process; the first caller's timeout wins.
static CLIENT: OnceCell<Client> = OnceCell::new();

/// Competitions a daily run draws fixtures from.
pub const DEFAULT_ALLOW_LEAGUES: &[u32] = &[
    39, 140, 135, 78, 61, 88, 94, 203, 179, 180, 307, 143, 207, 144, 156, 106, 235, 10, 11, 848,
    142, 141, 343, 119, 40, 569, 571, 262, 607,
];

#[derive(Debug, Clone)]
pub struct ApiFootballConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub retries: usize,
    pub backoff: Duration,
    pub timeout: Duration,
    /// Empty means every league is accepted.
    pub allow_leagues: HashSet<u32>,
    pub parallelism: usize,
    /// Zone kickoff times are shown in.
    pub timezone: Tz,
}

impl ApiFootballConfig {
    pub fn from_env() -> Self {
        let api_key = env::var("API_FOOTBALL_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let base_url = env::var("API_FOOTBALL_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let retries = env_usize("HTTP_RETRIES", DEFAULT_RETRIES).clamp(1, 10);
        let backoff_ms = env::var("HTTP_BACKOFF_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_BACKOFF_MS)
            .min(60_000);
        let timeout_secs = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 120);
        let allow_leagues = match env::var("ALLOW_LEAGUES") {
            Ok(raw) => parse_ids(&raw),
            Err(_) => DEFAULT_ALLOW_LEAGUES.iter().copied().collect(),
        };
        let parallelism = env_usize("FETCH_PARALLELISM", 6).clamp(2, 32);

        Self {
            api_key,
            base_url,
            retries,
            backoff: Duration::from_millis(backoff_ms),
            timeout: Duration::from_secs(timeout_secs),
            allow_leagues,
            parallelism,
            timezone: timezone_from_env(),
        }
    }
}

fn parse_ids(raw: &str) -> HashSet<u32> {
    raw.split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter(|id| *id != 0)
        .collect()
}

/// Fixture, odds and result source. Retries live here and nowhere else.
pub struct ApiFootball {
    cfg: ApiFootballConfig,
    client: &'static Client,
}

impl ApiFootball {
    pub fn new(cfg: ApiFootballConfig) -> Result<Self> {
        if cfg.api_key.is_none() {
            return Err(anyhow!("API_FOOTBALL_KEY is missing"));
        }
        let client = shared_client(cfg.timeout)?;
        Ok(Self { cfg, client })
    }

    fn get(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let key = self.cfg.api_key.as_deref().unwrap_or_default();
        let url = format!("{}{}", self.cfg.base_url, path);
        let mut backoff = self.cfg.backoff;

        for attempt in 1..=self.cfg.retries {
            let outcome = self
                .client
                .get(&url)
                .query(params)
                .header("x-apisports-key", key)
                .send()
                .and_then(|resp| {
                    let status = resp.status();
                    resp.text().map(|body| (status, body))
                });
            match outcome {
                Ok((status, body)) if status.is_success() => return Ok(body),
                Ok((status, body)) => {
                    let snippet: String = body.trim().chars().take(200).collect();
                    warn!(path, attempt, %status, body = %snippet, "api-football http error");
                }
                Err(err) => warn!(path, attempt, error = %err, "api-football transient error"),
            }
            if attempt < self.cfg.retries {
                thread::sleep(backoff);
                backoff = backoff.mul_f64(BACKOFF_FACTOR);
            }
        }
        Err(anyhow!("{path}: retries exhausted"))
    }

    pub fn fetch_fixtures(&self, date: &str) -> Result<Vec<FixtureInfo>> {
        let body = self
            .get("/fixtures", &[("date", date.to_string())])
            .context("fixtures request failed")?;
        parse_fixtures_json(&body, &self.cfg.allow_leagues, self.cfg.timezone)
    }

    pub fn fetch_best_odds(&self, fixture_id: u64) -> Result<BTreeMap<Selection, f64>> {
        let body = self
            .get("/odds", &[("fixture", fixture_id.to_string())])
            .context("odds request failed")?;
        parse_odds_json(&body)
    }

    /// Fixtures for `date` with their best odds. A fixture whose odds cannot
    /// be fetched is left out rather than failing the whole day.
    pub fn fetch_fixture_odds(&self, date: &str) -> Result<Vec<FixtureOdds>> {
        let fixtures = self.fetch_fixtures(date)?;
        info!(date, fixtures = fixtures.len(), "fixtures in allowed leagues");

        let out: Vec<FixtureOdds> = self.with_fetch_pool(|| {
            fixtures
                .par_iter()
                .filter_map(|fixture| match self.fetch_best_odds(fixture.fixture_id) {
                    Ok(odds) => {
                        debug!(
                            fixture_id = fixture.fixture_id,
                            selections = odds.len(),
                            "odds fetched"
                        );
                        Some(FixtureOdds {
                            fixture: fixture.clone(),
                            odds,
                        })
                    }
                    Err(err) => {
                        warn!(
                            fixture_id = fixture.fixture_id,
                            error = %err,
                            "skipping fixture without odds"
                        );
                        None
                    }
                })
                .collect()
        });
        Ok(out)
    }

    pub fn fetch_result(&self, fixture_id: u64) -> Result<Option<FixtureResult>> {
        let body = self
            .get("/fixtures", &[("id", fixture_id.to_string())])
            .context("fixture result request failed")?;
        parse_fixture_result_json(&body)
    }

    /// Results keyed by fixture id. Failed lookups are missing from the map,
    /// which grades the affected legs as pending.
    pub fn fetch_results(&self, fixture_ids: &[u64]) -> HashMap<u64, FixtureResult> {
        let mut ids = fixture_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        self.with_fetch_pool(|| {
            ids.par_iter()
                .filter_map(|id| match self.fetch_result(*id) {
                    Ok(result) => result.map(|r| (*id, r)),
                    Err(err) => {
                        warn!(fixture_id = *id, error = %err, "result unavailable");
                        None
                    }
                })
                .collect()
        })
    }

    fn with_fetch_pool<T, F>(&self, action: F) -> T
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.cfg.parallelism)
            .build()
        {
            Ok(pool) => pool.install(action),
            Err(_) => action(),
        }
    }
}

fn shared_client(timeout: Duration) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout)
            .user_agent(concat!("focus-tickets/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build api-football client")
    })
}

fn response_array(root: &Value) -> &[Value] {
    root.get("response")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn parse_root(raw: &str) -> Result<Option<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid api-football json")?;
    Ok(Some(root))
}

pub fn parse_fixtures_json(
    raw: &str,
    allow_leagues: &HashSet<u32>,
    tz: Tz,
) -> Result<Vec<FixtureInfo>> {
    let Some(root) = parse_root(raw)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for item in response_array(&root) {
        let Some(fixture_id) = item
            .get("fixture")
            .and_then(|f| f.get("id"))
            .and_then(|id| id.as_u64())
        else {
            continue;
        };
        let league = item.get("league").unwrap_or(&Value::Null);
        let league_id = league.get("id").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if !allow_leagues.is_empty() && !allow_leagues.contains(&league_id) {
            continue;
        }
        let country = str_at(league, &["country"]);
        let league_name = str_at(league, &["name"]);
        let kickoff_raw = str_at(item, &["fixture", "date"]);

        out.push(FixtureInfo {
            fixture_id,
            league: if country.is_empty() {
                league_name
            } else {
                format!("{country} - {league_name}")
            },
            country,
            home: str_at(item, &["teams", "home", "name"]),
            away: str_at(item, &["teams", "away", "name"]),
            kickoff: format_kickoff(&kickoff_raw, tz),
        });
    }
    Ok(out)
}

/// Best price per catalogue selection across every bookmaker in the
/// response. Bets and values outside the catalogue are ignored.
pub fn parse_odds_json(raw: &str) -> Result<BTreeMap<Selection, f64>> {
    let mut best: BTreeMap<Selection, f64> = BTreeMap::new();
    let Some(root) = parse_root(raw)? else {
        return Ok(best);
    };
    for item in response_array(&root) {
        let bookmakers = item.get("bookmakers").and_then(|v| v.as_array());
        for bookmaker in bookmakers.into_iter().flatten() {
            let bets = bookmaker.get("bets").and_then(|v| v.as_array());
            for bet in bets.into_iter().flatten() {
                let Some(market) = bet
                    .get("name")
                    .and_then(|v| v.as_str())
                    .and_then(Market::parse)
                else {
                    continue;
                };
                let values = bet.get("values").and_then(|v| v.as_array());
                for value in values.into_iter().flatten() {
                    let Some(selection) = value
                        .get("value")
                        .and_then(|v| v.as_str())
                        .and_then(Outcome::parse)
                        .and_then(|outcome| Selection::new(market, outcome))
                    else {
                        continue;
                    };
                    let Some(odds) = value.get("odd").and_then(odds_value) else {
                        continue;
                    };
                    let entry = best.entry(selection).or_insert(odds);
                    if odds > *entry {
                        *entry = odds;
                    }
                }
            }
        }
    }
    Ok(best)
}

pub fn parse_fixture_result_json(raw: &str) -> Result<Option<FixtureResult>> {
    let Some(root) = parse_root(raw)? else {
        return Ok(None);
    };
    let Some(item) = response_array(&root).first() else {
        return Ok(None);
    };
    let Some(fixture_id) = item
        .get("fixture")
        .and_then(|f| f.get("id"))
        .and_then(|id| id.as_u64())
    else {
        return Ok(None);
    };
    let goals = item.get("goals").unwrap_or(&Value::Null);
    let half_time = item
        .get("score")
        .and_then(|s| s.get("halftime"))
        .unwrap_or(&Value::Null);

    Ok(Some(FixtureResult {
        fixture_id,
        status: str_at(item, &["fixture", "status", "short"]),
        goals_home: goal_count(goals.get("home")),
        goals_away: goal_count(goals.get("away")),
        ht_home: goal_count(half_time.get("home")),
        ht_away: goal_count(half_time.get("away")),
    }))
}

fn odds_value(v: &Value) -> Option<f64> {
    let odds = match v {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    is_valid_odds(odds).then_some(odds)
}

fn goal_count(v: Option<&Value>) -> Option<u32> {
    match v? {
        Value::Number(n) => n.as_u64().and_then(|g| u32::try_from(g).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn str_at(v: &Value, path: &[&str]) -> String {
    let mut cur = v;
    for key in path {
        match cur.get(*key) {
            Some(next) => cur = next,
            None => return String::new(),
        }
    }
    cur.as_str().map(|s| s.trim().to_string()).unwrap_or_default()
}

/// "2025-10-30T18:00:00+00:00" -> "2025-10-30 19:00" for a UTC+1 `tz`.
/// Unparseable input is returned unchanged.
pub fn format_kickoff(raw: &str, tz: Tz) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(dt) => dt.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.trim().to_string(),
    }
}
