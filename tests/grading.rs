use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use focus_tickets::evaluation::{aggregate, evaluate_ticket};
use focus_tickets::grading::{FinalStatuses, FixtureResult, Verdict, grade_leg};
use focus_tickets::payload::{StoredLeg, StoredTicket, parse_stored_ticket_json};
use focus_tickets::store::load_results_snapshot;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture file should be readable")
}

fn finished(home: u32, away: u32) -> FixtureResult {
    FixtureResult {
        fixture_id: 1,
        status: "FT".to_string(),
        goals_home: Some(home),
        goals_away: Some(away),
        ht_home: Some(0),
        ht_away: Some(0),
    }
}

fn grade(market: &str, pick: &str, result: &FixtureResult) -> Verdict {
    grade_leg(market, pick, Some(result), &FinalStatuses::default()).result
}

#[test]
fn grades_basic_markets_on_final_scores() {
    assert_eq!(grade("Match Winner", "Home", &finished(2, 0)), Verdict::Win);
    assert_eq!(grade("Match Winner", "Away", &finished(2, 0)), Verdict::Lose);
    assert_eq!(grade("Match Winner", "Draw", &finished(1, 1)), Verdict::Win);
    assert_eq!(grade("Double Chance", "X2", &finished(1, 1)), Verdict::Win);
    assert_eq!(grade("Double Chance", "12", &finished(1, 1)), Verdict::Lose);
    assert_eq!(grade("Over/Under", "Over 2.5", &finished(1, 1)), Verdict::Lose);
    assert_eq!(grade("Over/Under", "Over 2.5", &finished(2, 1)), Verdict::Win);
    assert_eq!(grade("Over/Under", "Under 3.5", &finished(2, 1)), Verdict::Win);
    assert_eq!(grade("BTTS", "No", &finished(0, 0)), Verdict::Win);
    assert_eq!(grade("BTTS", "No", &finished(1, 0)), Verdict::Win);
    assert_eq!(grade("BTTS", "No", &finished(1, 1)), Verdict::Lose);
    assert_eq!(grade("Home Team Goals", "Over 0.5", &finished(0, 3)), Verdict::Lose);
    assert_eq!(grade("Away Team Goals", "Over 0.5", &finished(0, 3)), Verdict::Win);
}

#[test]
fn whole_lines_count_the_exact_total_as_over() {
    assert_eq!(grade("Over/Under", "Over 2.0", &finished(1, 1)), Verdict::Win);
    assert_eq!(grade("Over/Under", "Over 2.0", &finished(1, 0)), Verdict::Lose);
}

#[test]
fn unknown_labels_lose_once_final() {
    assert_eq!(grade("Corners", "Over 9.5", &finished(1, 1)), Verdict::Lose);
    assert_eq!(grade("BTTS", "Maybe", &finished(1, 1)), Verdict::Lose);
}

#[test]
fn grading_is_idempotent() {
    let r = finished(3, 2);
    let finals = FinalStatuses::default();
    let first = grade_leg("Over/Under", "Over 2.5", Some(&r), &finals);
    let second = grade_leg("Over/Under", "Over 2.5", Some(&r), &finals);
    assert_eq!(first, second);
    assert_eq!(first.score_ft.as_deref(), Some("3-2"));
    assert_eq!(first.score_ht.as_deref(), Some("0-0"));
}

#[test]
fn aggregate_orders_lose_over_pending_over_win() {
    assert_eq!(aggregate(&[]), Verdict::Pending);
    assert_eq!(aggregate(&[Verdict::Win, Verdict::Win]), Verdict::Win);
    assert_eq!(aggregate(&[Verdict::Win, Verdict::Pending]), Verdict::Pending);
    assert_eq!(aggregate(&[Verdict::Pending, Verdict::Lose, Verdict::Win]), Verdict::Lose);
}

#[test]
fn ticket_with_unstarted_leg_stays_pending() {
    let ticket = parse_stored_ticket_json(&read_fixture("ticket_3plus.json")).expect("ticket");
    let results = load_results_snapshot(&fixture_path("results.json")).expect("results");

    let eval = evaluate_ticket(Some("3plus"), &ticket, &results, &FinalStatuses::default());
    assert_eq!(eval.name.as_deref(), Some("3plus"));
    assert_eq!(eval.date.as_deref(), Some("2026-10-17"));
    assert_eq!(eval.target_odds, Some(3.0));
    assert_eq!(eval.ticket_result, Verdict::Pending);
    assert_eq!((eval.wins, eval.loses, eval.pendings), (3, 0, 1));
    assert_eq!(eval.legs[0].score_ft.as_deref(), Some("2-0"));
    assert_eq!(eval.legs[3].result, Verdict::Pending);
    assert!(eval.legs[3].score_ft.is_none());
}

#[test]
fn legacy_ticket_loses_despite_pending_leg() {
    let ticket = parse_stored_ticket_json(&read_fixture("ticket_legacy.json")).expect("ticket");
    assert_eq!(ticket.target_odds, Some(2.0));
    assert_eq!(ticket.legs[1].fixture_id, Some(1382358));
    assert_eq!(ticket.legs[1].odds, Some(1.24));
    assert_eq!(ticket.legs[2].fixture_id, None);

    let results = load_results_snapshot(&fixture_path("results.json")).expect("results");
    let eval = evaluate_ticket(None, &ticket, &results, &FinalStatuses::default());
    let verdicts: Vec<Verdict> = eval.legs.iter().map(|l| l.result).collect();
    assert_eq!(verdicts, vec![Verdict::Win, Verdict::Lose, Verdict::Pending]);
    assert_eq!(eval.ticket_result, Verdict::Lose);
}

#[test]
fn custom_final_statuses_gate_grading() {
    let mut result = finished(2, 0);
    result.status = "AWD".to_string();
    let ticket = StoredTicket {
        legs: vec![StoredLeg {
            fixture_id: Some(1),
            market: "Match Winner".to_string(),
            pick: "Home".to_string(),
            odds: Some(1.4),
        }],
        ..StoredTicket::default()
    };
    let results = HashMap::from([(1u64, result)]);

    let default = evaluate_ticket(None, &ticket, &results, &FinalStatuses::default());
    assert_eq!(default.ticket_result, Verdict::Pending);

    let widened = FinalStatuses::new(["FT", "AWD"]);
    let eval = evaluate_ticket(None, &ticket, &results, &widened);
    assert_eq!(eval.ticket_result, Verdict::Win);
}

#[test]
fn empty_ticket_is_pending() {
    let ticket = parse_stored_ticket_json("{}").expect("empty object");
    let eval = evaluate_ticket(None, &ticket, &HashMap::new(), &FinalStatuses::default());
    assert_eq!(eval.ticket_result, Verdict::Pending);
    assert_eq!((eval.wins, eval.loses, eval.pendings), (0, 0, 0));
}

#[test]
fn corrupt_goal_counts_in_snapshot_do_not_break_grading() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("results.json");
    fs::write(
        &path,
        r#"[{"fixture_id": 9, "status": "FT", "goals_home": 4294967295, "goals_away": 1}]"#,
    )
    .expect("write");
    let results = load_results_snapshot(&path).expect("snapshot");

    let ticket = parse_stored_ticket_json(
        r#"{"legs": [{"fixture_id": 9, "market": "Over/Under", "pick": "Over 2.5"}]}"#,
    )
    .expect("ticket");
    let eval = evaluate_ticket(None, &ticket, &results, &FinalStatuses::default());
    assert_eq!(eval.ticket_result, Verdict::Win);
    assert_eq!(eval.legs[0].score_ft.as_deref(), Some("4294967295-1"));
}
