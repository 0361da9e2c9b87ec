//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The engine calls store methods and never executes SQL directly.

use crate::{
    calendar::Month,
    config::RetentionConfig,
    engine::RunOutput,
    error::RetentionResult,
    event::EventLogEntry,
};
mod output;
use rusqlite::{params, types::Type, Connection, OptionalExtension};

pub struct RetentionStore {
    conn: Connection,
}

impl RetentionStore {
    pub fn open(path: &str) -> RetentionResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RetentionResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RetentionResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    /// Persist a finished run: run row, event log and every output table,
    /// all in one transaction.
    pub fn save_run(
        &self,
        run_id: &str,
        config: &RetentionConfig,
        output: &RunOutput,
    ) -> RetentionResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        self.insert_run(run_id, config)?;
        for (seq, event) in output.events.iter().enumerate() {
            self.append_event(&EventLogEntry {
                id:         None,
                run_id:     run_id.to_string(),
                seq:        seq as u64,
                event_type: event.type_name().to_string(),
                payload:    serde_json::to_string(event)?,
            })?;
        }
        self.save_classified(run_id, &output.classified)?;
        self.save_stats(run_id, &output.stats)?;
        self.save_conversion(run_id, &output.bucket_labels, &output.conversion)?;
        for snapshot in &output.snapshots {
            self.save_cohort_snapshot(run_id, snapshot)?;
        }

        tx.commit()?;
        log::debug!("store: run {run_id} persisted");
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, config: &RetentionConfig) -> RetentionResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, version, config_json, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id,
                env!("CARGO_PKG_VERSION"),
                serde_json::to_string(config)?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn run_exists(&self, run_id: &str) -> RetentionResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM run WHERE run_id = ?1",
                params![run_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn run_config(&self, run_id: &str) -> RetentionResult<Option<RetentionConfig>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT config_json FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> RetentionResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, seq, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.run_id, entry.seq as i64, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> RetentionResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    seq:        row.get::<_, i64>(2)? as u64,
                    event_type: row.get(3)?,
                    payload:    row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

/// Read a month column, surfacing bad text as a conversion error.
fn month_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Month> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
