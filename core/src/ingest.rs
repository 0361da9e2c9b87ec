//! CSV ingestion of raw visit events.
//!
//! The first record is a header naming at least `venue_chain_id`,
//! `venue_id`, `user_id` and `date` (a `timestamp` column is accepted in
//! place of `date`). Column order is free and extra columns are ignored.
//! Any bad record fails the whole load with its line number.

use crate::{
    error::{RetentionError, RetentionResult},
    visit::VisitEvent,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::{fs::File, io::Read};

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub fn load_visits_csv(path: &str) -> RetentionResult<Vec<VisitEvent>> {
    let file = File::open(path)?;
    let events = parse_visits_csv(file)?;
    log::info!("ingest: {} visit events read from {path}", events.len());
    Ok(events)
}

struct Columns {
    chain: usize,
    venue: usize,
    user:  usize,
    date:  usize,
}

impl Columns {
    fn from_header(header: &StringRecord) -> RetentionResult<Self> {
        let names: Vec<String> = header
            .iter()
            .map(|f| f.trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();
        let find = |wanted: &[&str]| {
            names
                .iter()
                .position(|n| wanted.contains(&n.as_str()))
                .ok_or_else(|| RetentionError::MalformedInput {
                    line:   1,
                    reason: format!("header is missing column '{}'", wanted[0]),
                })
        };
        Ok(Self {
            chain: find(&["venue_chain_id"])?,
            venue: find(&["venue_id"])?,
            user:  find(&["user_id"])?,
            date:  find(&["date", "timestamp"])?,
        })
    }
}

pub fn parse_visits_csv<R: Read>(reader: R) -> RetentionResult<Vec<VisitEvent>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let header = rdr.headers().map_err(malformed)?.clone();
    if header.iter().all(str::is_empty) {
        return Ok(Vec::new());
    }
    let cols = Columns::from_header(&header)?;

    let mut events = Vec::new();
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record).map_err(malformed)? {
        let line_no = record.position().map_or(0, |p| p.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }

        let date_text = required(&record, cols.date, "date", line_no)?;
        let timestamp = parse_timestamp(date_text).ok_or_else(|| RetentionError::MalformedInput {
            line:   line_no,
            reason: format!("unparseable date '{date_text}'"),
        })?;

        events.push(VisitEvent {
            venue_chain_id: required(&record, cols.chain, "venue_chain_id", line_no)?.to_string(),
            venue_id:       required(&record, cols.venue, "venue_id", line_no)?.to_string(),
            user_id:        required(&record, cols.user, "user_id", line_no)?.to_string(),
            timestamp,
        });
    }

    Ok(events)
}

/// Date-only values land at midnight. Offsets are kept as local wall time,
/// so the calendar day is the one the venue saw.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn required<'a>(record: &'a StringRecord, idx: usize, name: &str, line: usize) -> RetentionResult<&'a str> {
    match record.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RetentionError::MalformedInput {
            line,
            reason: format!("missing {name}"),
        }),
    }
}

/// Reader errors carry the line they stopped on; I/O failures stay I/O.
fn malformed(err: csv::Error) -> RetentionError {
    if err.is_io_error() {
        return RetentionError::Csv(err);
    }
    match err.position() {
        Some(pos) => RetentionError::MalformedInput {
            line:   pos.line() as usize,
            reason: err.to_string(),
        },
        None => RetentionError::Csv(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_only_and_datetime_forms() {
        let midnight = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(midnight.to_string(), "2024-01-15 00:00:00");

        let spaced = parse_timestamp("2024-01-15 18:30:00").unwrap();
        assert_eq!(spaced.date(), midnight.date());

        let rfc = parse_timestamp("2024-01-15T23:30:00+02:00").unwrap();
        assert_eq!(rfc.date(), midnight.date());

        assert!(parse_timestamp("15/01/2024").is_none());
    }
}
