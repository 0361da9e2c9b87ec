//! CSV ingestion: header handling, timestamps, and line-numbered errors.

use retention_core::{
    compute,
    ingest::parse_visits_csv,
    RetentionConfig, RetentionError,
};
use std::io::Cursor;

fn parse(text: &str) -> Result<Vec<retention_core::VisitEvent>, RetentionError> {
    parse_visits_csv(Cursor::new(text))
}

#[test]
fn reads_columns_in_any_order() {
    let csv = "\
user_id,date,venue_id,venue_chain_id,amount
A,2024-01-10,venue-1,chain-1,12.50
\"B\",2024-01-05 09:15:00,venue-1,chain-1,3.00

B,2024-02-05T09:15:00,venue-1,chain-1,4.00
";
    let events = parse(csv).expect("valid csv");

    assert_eq!(events.len(), 3, "blank lines are skipped");
    assert_eq!(events[0].user_id, "A");
    assert_eq!(events[0].venue_chain_id, "chain-1");
    assert_eq!(events[1].user_id, "B", "quotes are stripped");
    assert_eq!(events[1].timestamp.to_string(), "2024-01-05 09:15:00");
    assert_eq!(events[2].day().to_string(), "2024-02-05");
}

#[test]
fn timestamp_header_is_accepted_for_date() {
    let csv = "venue_chain_id,venue_id,user_id,timestamp\nc,v,u,2024-03-01T23:59:00+01:00\n";
    let events = parse(csv).expect("valid csv");
    assert_eq!(events[0].day().to_string(), "2024-03-01", "local wall-clock day");
}

#[test]
fn quoted_fields_keep_their_commas() {
    let csv = "venue_chain_id,venue_id,user_id,date\n\"Acme, Inc\",v1,u1,2024-01-05\n";
    let events = parse(csv).expect("valid csv");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].venue_chain_id, "Acme, Inc");
    assert_eq!(events[0].user_id, "u1");
    assert_eq!(events[0].day().to_string(), "2024-01-05");
}

#[test]
fn byte_order_mark_before_header_is_ignored() {
    let csv = "\u{feff}venue_chain_id,venue_id,user_id,date\nc,v,u,2024-01-05\n";
    let events = parse(csv).expect("BOM-prefixed csv");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].venue_chain_id, "c");
}

#[test]
fn empty_input_is_an_empty_log() {
    assert!(parse("").expect("empty").is_empty());
    assert!(parse("venue_chain_id,venue_id,user_id,date\n").expect("header only").is_empty());
}

#[test]
fn missing_header_column_is_reported_on_line_one() {
    let err = parse("venue_chain_id,venue_id,date\nc,v,2024-01-01\n").unwrap_err();
    match err {
        RetentionError::MalformedInput { line, reason } => {
            assert_eq!(line, 1);
            assert!(reason.contains("user_id"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn bad_date_names_its_line() {
    let csv = "venue_chain_id,venue_id,user_id,date\nc,v,u,2024-01-01\nc,v,u,01/02/2024\n";
    match parse(csv).unwrap_err() {
        RetentionError::MalformedInput { line, reason } => {
            assert_eq!(line, 3);
            assert!(reason.contains("01/02/2024"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_required_field_is_rejected() {
    let csv = "venue_chain_id,venue_id,user_id,date\nc,v,,2024-01-01\n";
    match parse(csv).unwrap_err() {
        RetentionError::MalformedInput { line, reason } => {
            assert_eq!(line, 2);
            assert!(reason.contains("user_id"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parsed_log_runs_end_to_end() {
    let csv = "\
venue_chain_id,venue_id,user_id,date
chain-1,venue-1,A,2024-01-10
chain-1,venue-1,B,2024-01-05
chain-1,venue-1,B,2024-02-05
chain-1,venue-1,B,2024-03-05
chain-1,venue-1,A,2024-04-09
";
    let events = parse(csv).expect("valid csv");
    let out = compute("csv", &events, &RetentionConfig::default()).expect("run");

    assert_eq!(out.classified.len(), 4);
    assert!(out.classified[3].returning.contains("A"));
    assert_eq!(out.conversion.len(), 2, "February and April have returns");
    assert_eq!(out.conversion[1].counts, vec![0, 0, 1, 0, 0, 0]);
}
