use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use chrono_tz::{Europe, UTC};

use focus_tickets::api_football::{
    DEFAULT_ALLOW_LEAGUES, parse_fixture_result_json, parse_fixtures_json, parse_odds_json,
};
use focus_tickets::grading::{FinalStatuses, Verdict, grade_leg};
use focus_tickets::leg_pool::{FixtureOdds, build_leg_pool};
use focus_tickets::market::Selection;
use focus_tickets::thresholds::ThresholdTable;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn sel(market: &str, pick: &str) -> Selection {
    Selection::parse(market, pick).expect("legal selection")
}

#[test]
fn parses_fixtures_within_allowed_leagues() {
    let raw = read_fixture("api_fixtures.json");
    let allow: HashSet<u32> = DEFAULT_ALLOW_LEAGUES.iter().copied().collect();
    let fixtures =
        parse_fixtures_json(&raw, &allow, Europe::Belgrade).expect("fixture should parse");

    assert_eq!(fixtures.len(), 2);
    let first = &fixtures[0];
    assert_eq!(first.fixture_id, 1208101);
    assert_eq!(first.country, "England");
    assert_eq!(first.league, "England - Premier League");
    assert_eq!(first.home, "Liverpool");
    assert_eq!(first.away, "Brentford");
    // 15:00 UTC and 20:00 at +02:00, shown in Belgrade summer time.
    assert_eq!(first.kickoff, "2026-10-18 17:00");
    assert_eq!(fixtures[1].kickoff, "2026-10-18 20:00");
}

#[test]
fn empty_allow_list_accepts_every_league() {
    let raw = read_fixture("api_fixtures.json");
    let fixtures = parse_fixtures_json(&raw, &HashSet::new(), UTC).expect("fixture should parse");
    let ids: Vec<u64> = fixtures.iter().map(|f| f.fixture_id).collect();
    assert_eq!(ids, vec![1208101, 1208102, 1208103]);
}

#[test]
fn kickoff_display_zone_is_configurable() {
    let raw = read_fixture("api_fixtures.json");
    let utc = parse_fixtures_json(&raw, &HashSet::new(), UTC).expect("fixture should parse");
    let tokyo = parse_fixtures_json(&raw, &HashSet::new(), chrono_tz::Asia::Tokyo)
        .expect("fixture should parse");
    assert_eq!(utc[0].kickoff, "2026-10-18 15:00");
    assert_eq!(utc[1].kickoff, "2026-10-18 18:00");
    assert_eq!(tokyo[0].kickoff, "2026-10-19 00:00");
}

#[test]
fn odds_keep_best_price_per_catalogue_selection() {
    let raw = read_fixture("api_odds.json");
    let odds = parse_odds_json(&raw).expect("odds should parse");

    assert_eq!(odds.get(&sel("Match Winner", "Home")), Some(&1.50));
    assert_eq!(odds.get(&sel("Match Winner", "Away")), Some(&6.50));
    assert_eq!(odds.get(&sel("Over/Under", "Over 2.5")), Some(&1.80));
    assert_eq!(odds.get(&sel("Over/Under", "Under 2.5")), Some(&2.00));
    assert_eq!(odds.get(&sel("BTTS", "Yes")), Some(&1.70));
    assert_eq!(odds.get(&sel("BTTS", "No")), None);
    assert_eq!(odds.get(&sel("Double Chance", "1X")), Some(&1.12));
    assert_eq!(odds.get(&sel("1st Half Goals", "Over 0.5")), Some(&1.30));
    assert_eq!(odds.get(&sel("Home Team Goals", "Over 0.5")), Some(&1.08));
    assert_eq!(odds.len(), 11);
}

#[test]
fn parsed_odds_feed_the_leg_pool() {
    let fixtures = parse_fixtures_json(&read_fixture("api_fixtures.json"), &HashSet::new(), UTC)
        .expect("fixtures");
    let odds = parse_odds_json(&read_fixture("api_odds.json")).expect("odds");
    let rows = vec![FixtureOdds {
        fixture: fixtures[0].clone(),
        odds,
    }];

    let pool = build_leg_pool(&rows, &ThresholdTable::baseline());
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].selection, sel("Over/Under", "Over 1.5"));
    assert_eq!(pool[0].odds, 1.20);
    assert!(!pool[0].is_heavy_favorite());
}

#[test]
fn parses_finished_result_and_grades_it() {
    let result = parse_fixture_result_json(&read_fixture("api_result.json"))
        .expect("result should parse")
        .expect("result present");
    assert_eq!(result.fixture_id, 1208101);
    assert_eq!(result.status, "FT");
    assert_eq!(result.full_time(), Some((3, 1)));
    assert_eq!(result.half_time(), Some((1, 0)));

    let grade = grade_leg("BTTS", "Yes", Some(&result), &FinalStatuses::default());
    assert_eq!(grade.result, Verdict::Win);
    assert_eq!(grade.score_ht.as_deref(), Some("1-0"));
}

#[test]
fn live_result_has_partial_goals_and_stays_pending() {
    let result = parse_fixture_result_json(&read_fixture("api_result_live.json"))
        .expect("result should parse")
        .expect("result present");
    assert_eq!(result.status, "1H");
    assert_eq!(result.goals_home, Some(0));
    assert_eq!(result.goals_away, None);
    assert_eq!(result.half_time(), None);

    let grade = grade_leg("Match Winner", "Home", Some(&result), &FinalStatuses::default());
    assert_eq!(grade.result, Verdict::Pending);
}

#[test]
fn malformed_json_is_an_error() {
    assert!(parse_odds_json("{not json").is_err());
    assert!(parse_odds_json("null").expect("null is empty").is_empty());
}
