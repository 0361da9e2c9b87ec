//! Store methods for the run's output tables.

use super::{month_column, RetentionStore};
use crate::{
    classifier::ClassifiedMonth,
    cohort_accumulator::CohortSnapshot,
    conversion_analyzer::ConversionRow,
    error::RetentionResult,
    trend_smoother::TrendPoint,
    types::VenueKey,
};
use rusqlite::{params, types::Type, OptionalExtension};
use std::collections::BTreeSet;

impl RetentionStore {
    // ── Classification ─────────────────────────────────────────

    pub fn save_classified(&self, run_id: &str, rows: &[ClassifiedMonth]) -> RetentionResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO visitor_month (
                run_id, venue_chain_id, venue_id, month,
                new_ids, return_ids, repeat_ids, sentinel_visits
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for cm in rows {
            stmt.execute(params![
                run_id,
                cm.venue.venue_chain_id,
                cm.venue.venue_id,
                cm.month.to_string(),
                serde_json::to_string(&cm.new)?,
                serde_json::to_string(&cm.returning)?,
                serde_json::to_string(&cm.repeat)?,
                cm.sentinel_visits,
            ])?;
        }
        Ok(())
    }

    pub fn classified_for_run(&self, run_id: &str) -> RetentionResult<Vec<ClassifiedMonth>> {
        let mut stmt = self.conn.prepare(
            "SELECT venue_chain_id, venue_id, month, new_ids, return_ids, repeat_ids, sentinel_visits
             FROM visitor_month WHERE run_id = ?1
             ORDER BY venue_chain_id, venue_id, month",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(ClassifiedMonth {
                    venue:           VenueKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    month:           month_column(row, 2)?,
                    new:             id_set_column(row, 3)?,
                    returning:       id_set_column(row, 4)?,
                    repeat:          id_set_column(row, 5)?,
                    sentinel_visits: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Stats ──────────────────────────────────────────────────

    pub fn save_stats(&self, run_id: &str, rows: &[TrendPoint]) -> RetentionResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO visitor_stats (
                run_id, venue_chain_id, venue_id, month,
                new_count, return_count, repeat_count, new_12m_mean, return_12m_mean
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for p in rows {
            stmt.execute(params![
                run_id,
                p.venue.venue_chain_id,
                p.venue.venue_id,
                p.month.to_string(),
                p.new as i64,
                p.returning as i64,
                p.repeat as i64,
                p.new_12m_mean,
                p.return_12m_mean,
            ])?;
        }
        Ok(())
    }

    pub fn stats_for_run(&self, run_id: &str) -> RetentionResult<Vec<TrendPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT venue_chain_id, venue_id, month,
                    new_count, return_count, repeat_count, new_12m_mean, return_12m_mean
             FROM visitor_stats WHERE run_id = ?1
             ORDER BY venue_chain_id, venue_id, month",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(TrendPoint {
                    venue:           VenueKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    month:           month_column(row, 2)?,
                    new:             row.get::<_, i64>(3)? as u64,
                    returning:       row.get::<_, i64>(4)? as u64,
                    repeat:          row.get::<_, i64>(5)? as u64,
                    new_12m_mean:    row.get(6)?,
                    return_12m_mean: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Conversion ─────────────────────────────────────────────

    pub fn save_conversion(
        &self,
        run_id: &str,
        labels: &[String],
        rows: &[ConversionRow],
    ) -> RetentionResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO conversion_bin (
                run_id, venue_chain_id, venue_id, month, bucket_index, bucket_label, count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for row in rows {
            let month = row.month.to_string();
            for (idx, &count) in row.counts.iter().enumerate() {
                let label = labels.get(idx).map(String::as_str).unwrap_or("");
                stmt.execute(params![
                    run_id,
                    row.venue.venue_chain_id,
                    row.venue.venue_id,
                    month,
                    idx as i64,
                    label,
                    count as i64,
                ])?;
            }
        }
        Ok(())
    }

    /// Conversion rows re-pivoted to one row per venue-month.
    pub fn conversion_for_run(&self, run_id: &str) -> RetentionResult<Vec<ConversionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT venue_chain_id, venue_id, month, bucket_index, count
             FROM conversion_bin WHERE run_id = ?1
             ORDER BY venue_chain_id, venue_id, month, bucket_index",
        )?;
        let cells = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    VenueKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    month_column(row, 2)?,
                    row.get::<_, i64>(3)? as usize,
                    row.get::<_, i64>(4)? as u64,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows: Vec<ConversionRow> = Vec::new();
        for (venue, month, idx, count) in cells {
            let same_row = rows
                .last()
                .is_some_and(|r| r.venue == venue && r.month == month);
            if !same_row {
                rows.push(ConversionRow { venue, month, counts: Vec::new() });
            }
            if let Some(row) = rows.last_mut() {
                if row.counts.len() <= idx {
                    row.counts.resize(idx + 1, 0);
                }
                row.counts[idx] = count;
            }
        }
        Ok(rows)
    }

    pub fn conversion_labels(&self, run_id: &str) -> RetentionResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT bucket_index, bucket_label FROM conversion_bin
             WHERE run_id = ?1 ORDER BY bucket_index",
        )?;
        let labels = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(labels)
    }

    // ── Cohort snapshots ───────────────────────────────────────

    pub fn save_cohort_snapshot(&self, run_id: &str, snapshot: &CohortSnapshot) -> RetentionResult<()> {
        self.conn.execute(
            "INSERT INTO cohort_snapshot (run_id, venue_chain_id, venue_id, month, counts_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                snapshot.venue.venue_chain_id,
                snapshot.venue.venue_id,
                snapshot.month.to_string(),
                serde_json::to_string(&snapshot.counts)?,
            ],
        )?;
        Ok(())
    }

    /// The cohort map as it stood at the end of `month`, if it was kept.
    pub fn cohort_snapshot(
        &self,
        run_id: &str,
        venue: &VenueKey,
        month: crate::calendar::Month,
    ) -> RetentionResult<Option<CohortSnapshot>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT counts_json FROM cohort_snapshot
                 WHERE run_id = ?1 AND venue_chain_id = ?2 AND venue_id = ?3 AND month = ?4",
                params![run_id, venue.venue_chain_id, venue.venue_id, month.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match json {
            Some(j) => Some(CohortSnapshot {
                venue: venue.clone(),
                month,
                counts: serde_json::from_str(&j)?,
            }),
            None => None,
        })
    }
}

fn id_set_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<BTreeSet<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
