//! The run log: what the engine did, in order.
//!
//! RULE: Every stage completion is recorded as an event.
//! Events are persisted after the run succeeds, never mid-run.

use crate::{
    calendar::Month,
    types::{RunId, VenueKey},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during a run.
/// Variants are appended only, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunInitialized {
        run_id:      RunId,
        event_count: usize,
    },
    StageCompleted {
        stage: Stage,
        rows:  usize,
    },
    VenueFolded {
        venue:       VenueKey,
        first_month: Month,
        last_month:  Month,
        months:      usize,
        peak_cohort: usize,
        purged:      usize,
    },
    RunCompleted {
        run_id:          RunId,
        stats_rows:      usize,
        conversion_rows: usize,
    },
}

impl PipelineEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } => "run_initialized",
            Self::StageCompleted { .. } => "stage_completed",
            Self::VenueFolded { .. }    => "venue_folded",
            Self::RunCompleted { .. }   => "run_completed",
        }
    }
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normalize,
    GapTracking,
    MonthlyAggregation,
    CohortFold,
    Conversion,
    TrendSmoothing,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normalize          => "normalize",
            Self::GapTracking        => "gap_tracking",
            Self::MonthlyAggregation => "monthly_aggregation",
            Self::CohortFold         => "cohort_fold",
            Self::Conversion         => "conversion",
            Self::TrendSmoothing     => "trend_smoothing",
        }
    }
}

/// A persisted event_log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub seq:        u64,
    pub event_type: String,
    pub payload:    String,
}
