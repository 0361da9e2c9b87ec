//! The retention engine: one batch run from raw visits to summary tables.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Visit normalizer      events → daily visits
//!   2. Gap tracker           daily visits → gaps + non-return flags
//!   3. Monthly aggregator    gaps → per venue-month visitor counts
//!   4. Cohort fold           per venue, months ascending:
//!        a. classify month m against the accumulator (state at end of m-1)
//!        b. fold m into the accumulator, purge m's non-returning visitors
//!   5. Conversion analyzer   return sets → latency histograms
//!   6. Trend smoother        classified months → trailing means
//!
//! RULES:
//!   - Each venue's fold owns its accumulator; venues never share state.
//!   - Month m is always classified before it is folded.
//!   - Nothing is persisted unless every stage succeeded.

use crate::{
    classifier::{classify, ClassifiedMonth},
    cohort_accumulator::{CohortAccumulator, CohortSnapshot},
    config::RetentionConfig,
    conversion_analyzer::{analyze, ConversionRow, GapIndex, LatencyBins},
    error::RetentionResult,
    event::{PipelineEvent, Stage},
    gap_tracker::track_gaps,
    monthly_aggregator::{aggregate_monthly, VenueHistory},
    store::RetentionStore,
    trend_smoother::{smooth, TrendPoint},
    types::{RunId, VenueKey},
    visit::{normalize, VisitEvent},
};

/// Everything a run produces, fully materialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutput {
    /// Every observed venue-month, sorted by (venue, month).
    pub classified:    Vec<ClassifiedMonth>,
    /// Stats table: only rows with a full rolling window.
    pub stats:         Vec<TrendPoint>,
    /// Conversion table: one row per venue-month with returning visitors.
    pub conversion:    Vec<ConversionRow>,
    pub bucket_labels: Vec<String>,
    /// Empty unless `persist_cohort_snapshots` is set.
    pub snapshots:     Vec<CohortSnapshot>,
    pub events:        Vec<PipelineEvent>,
}

/// Run every stage in memory. Pure: no store, no I/O.
pub fn compute(
    run_id: &str,
    events: &[VisitEvent],
    config: &RetentionConfig,
) -> RetentionResult<RunOutput> {
    config.validate()?;

    let mut out = RunOutput::default();
    out.events.push(PipelineEvent::RunInitialized {
        run_id:      run_id.to_string(),
        event_count: events.len(),
    });

    let daily = normalize(events);
    out.events.push(stage_done(Stage::Normalize, daily.len()));

    let gaps = track_gaps(&daily, config);
    out.events.push(stage_done(Stage::GapTracking, gaps.len()));

    let histories = aggregate_monthly(&gaps);
    let venue_months = histories.values().map(|h| h.months.len()).sum();
    out.events.push(stage_done(Stage::MonthlyAggregation, venue_months));

    for (venue, history) in &histories {
        if let Some(folded) = fold_venue(venue, history, config, &mut out)? {
            out.events.push(folded);
        }
    }
    out.events.push(stage_done(Stage::CohortFold, out.classified.len()));

    let bins = LatencyBins::from_config(config);
    let index = GapIndex::build(&gaps);
    out.conversion = analyze(&out.classified, &index, &bins, config);
    out.bucket_labels = bins.labels();
    out.events.push(stage_done(Stage::Conversion, out.conversion.len()));

    out.stats = smooth(&out.classified, config.rolling_window);
    out.events.push(stage_done(Stage::TrendSmoothing, out.stats.len()));

    out.events.push(PipelineEvent::RunCompleted {
        run_id:          run_id.to_string(),
        stats_rows:      out.stats.len(),
        conversion_rows: out.conversion.len(),
    });
    Ok(out)
}

/// Classify then fold each month of one venue, in order.
fn fold_venue(
    venue: &VenueKey,
    history: &VenueHistory,
    config: &RetentionConfig,
    out: &mut RunOutput,
) -> RetentionResult<Option<PipelineEvent>> {
    let mut acc = CohortAccumulator::new(venue.clone());

    for (&month, activity) in &history.months {
        out.classified.push(classify(venue, month, activity, &acc, config));
        acc.fold_month(month, activity)?;

        if config.persist_cohort_snapshots {
            out.snapshots.extend(acc.snapshot());
        }
    }

    let (Some(&first_month), Some(&last_month)) =
        (history.months.keys().next(), history.months.keys().next_back())
    else {
        return Ok(None);
    };

    log::debug!(
        "fold: {venue} {first_month}..{last_month} peak_cohort={} purged={}",
        acc.peak_size(),
        acc.purged(),
    );

    Ok(Some(PipelineEvent::VenueFolded {
        venue: venue.clone(),
        first_month,
        last_month,
        months: history.months.len(),
        peak_cohort: acc.peak_size(),
        purged: acc.purged(),
    }))
}

fn stage_done(stage: Stage, rows: usize) -> PipelineEvent {
    log::info!("stage {} complete: {rows} rows", stage.name());
    PipelineEvent::StageCompleted { stage, rows }
}

pub struct RetentionEngine {
    pub run_id: RunId,
    config:     RetentionConfig,
    store:      RetentionStore,
}

impl RetentionEngine {
    pub fn new(run_id: RunId, config: RetentionConfig, store: RetentionStore) -> Self {
        Self { run_id, config, store }
    }

    /// Engine with a fresh random run id.
    pub fn build(config: RetentionConfig, store: RetentionStore) -> Self {
        let run_id = format!("run-{}", uuid::Uuid::new_v4());
        Self::new(run_id, config, store)
    }

    pub fn config(&self) -> &RetentionConfig { &self.config }
    pub fn store(&self) -> &RetentionStore { &self.store }

    /// Compute everything, then persist run, outputs and event log in one
    /// transaction. A failure leaves the store untouched.
    pub fn run(&mut self, events: &[VisitEvent]) -> RetentionResult<RunOutput> {
        let output = compute(&self.run_id, events, &self.config).map_err(|e| {
            log::error!("run {} aborted: {e}", self.run_id);
            e
        })?;

        self.store.save_run(&self.run_id, &self.config, &output)?;

        log::info!(
            "run {} complete: {} venue-months, {} stats rows, {} conversion rows",
            self.run_id,
            output.classified.len(),
            output.stats.len(),
            output.conversion.len(),
        );
        Ok(output)
    }
}
