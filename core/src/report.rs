//! CSV writers for the output tables.

use crate::{
    classifier::ClassifiedMonth,
    conversion_analyzer::ConversionRow,
    error::RetentionResult,
    trend_smoother::TrendPoint,
};
use csv::Writer;
use std::{fs::File, io::Write, path::Path};

pub const STATS_FILE: &str = "stats.csv";
pub const CONVERSION_FILE: &str = "conversion.csv";
pub const CLASSIFIED_FILE: &str = "classified.csv";

const KEY_COLUMNS: [&str; 3] = ["venue_chain_id", "venue_id", "date"];

pub fn write_stats<W: Write>(w: W, rows: &[TrendPoint]) -> RetentionResult<()> {
    let mut wtr = Writer::from_writer(w);
    wtr.write_record(KEY_COLUMNS.iter().chain(&[
        "new", "return", "repeat", "new_12m_mean", "return_12m_mean",
    ]))?;
    for p in rows {
        wtr.write_record([
            p.venue.venue_chain_id.clone(),
            p.venue.venue_id.clone(),
            p.month.to_string(),
            p.new.to_string(),
            p.returning.to_string(),
            p.repeat.to_string(),
            p.new_12m_mean.to_string(),
            p.return_12m_mean.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_conversion<W: Write>(
    w: W,
    labels: &[String],
    rows: &[ConversionRow],
) -> RetentionResult<()> {
    let mut wtr = Writer::from_writer(w);
    wtr.write_record(KEY_COLUMNS.iter().copied().chain(labels.iter().map(String::as_str)))?;
    for row in rows {
        let mut record = vec![
            row.venue.venue_chain_id.clone(),
            row.venue.venue_id.clone(),
            row.month.to_string(),
        ];
        record.extend(row.counts.iter().map(u64::to_string));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_classified<W: Write>(w: W, rows: &[ClassifiedMonth]) -> RetentionResult<()> {
    let mut wtr = Writer::from_writer(w);
    wtr.write_record(KEY_COLUMNS.iter().chain(&["new", "return", "repeat", "sentinel_visits"]))?;
    for cm in rows {
        wtr.write_record([
            cm.venue.venue_chain_id.clone(),
            cm.venue.venue_id.clone(),
            cm.month.to_string(),
            cm.new_count().to_string(),
            cm.return_count().to_string(),
            cm.repeat_count().to_string(),
            cm.sentinel_visits.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write all three tables into `dir`, creating it if needed.
pub fn write_all(
    dir: &Path,
    stats: &[TrendPoint],
    labels: &[String],
    conversion: &[ConversionRow],
    classified: &[ClassifiedMonth],
) -> RetentionResult<()> {
    std::fs::create_dir_all(dir)?;
    write_stats(File::create(dir.join(STATS_FILE))?, stats)?;
    write_conversion(File::create(dir.join(CONVERSION_FILE))?, labels, conversion)?;
    write_classified(File::create(dir.join(CLASSIFIED_FILE))?, classified)?;
    log::info!("report: tables written to {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{calendar::Month, types::VenueKey};

    #[test]
    fn conversion_table_has_one_column_per_bucket() {
        let labels = vec!["(-inf, 30]".to_string(), "(30, inf)".to_string()];
        let rows = vec![ConversionRow {
            venue:  VenueKey::new("c", "v"),
            month:  Month::new(2024, 2).unwrap(),
            counts: vec![3, 0],
        }];

        let mut buf = Vec::new();
        write_conversion(&mut buf, &labels, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text,
            "venue_chain_id,venue_id,date,\"(-inf, 30]\",\"(30, inf)\"\nc,v,2024-02-29,3,0\n"
        );
    }

    #[test]
    fn stats_table_is_dated_by_month_end() {
        let rows = vec![TrendPoint {
            venue:           VenueKey::new("c", "v"),
            month:           Month::new(2023, 12).unwrap(),
            new:             7,
            returning:       2,
            repeat:          5,
            new_12m_mean:    6.5,
            return_12m_mean: 7.0,
        }];

        let mut buf = Vec::new();
        write_stats(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.lines().nth(1), Some("c,v,2023-12-31,7,2,5,6.5,7"));
    }

    #[test]
    fn ids_with_commas_are_quoted() {
        let rows = vec![ClassifiedMonth {
            venue:           VenueKey::new("Acme, Inc", "v\"1"),
            month:           Month::new(2024, 1).unwrap(),
            new:             ["a".to_string()].into_iter().collect(),
            returning:       Default::default(),
            repeat:          Default::default(),
            sentinel_visits: 2,
        }];

        let mut buf = Vec::new();
        write_classified(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.lines().nth(1), Some("\"Acme, Inc\",\"v\"\"1\",2024-01-31,3,0,0,2"));

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let record = rdr.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "Acme, Inc");
        assert_eq!(&record[1], "v\"1");
    }
}
