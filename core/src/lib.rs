//! Venue retention analytics.
//!
//! Batch pipeline from raw visit events to two tables: monthly
//! new / return / repeat counts with trailing means, and return-latency
//! histograms. See `engine` for the stage order.

pub mod calendar;
pub mod classifier;
pub mod cohort_accumulator;
pub mod config;
pub mod conversion_analyzer;
pub mod engine;
pub mod error;
pub mod event;
pub mod gap_tracker;
pub mod ingest;
pub mod monthly_aggregator;
pub mod report;
pub mod rng;
pub mod store;
pub mod synthetic;
pub mod trend_smoother;
pub mod types;
pub mod visit;

pub use calendar::Month;
pub use config::RetentionConfig;
pub use engine::{compute, RetentionEngine, RunOutput};
pub use error::{RetentionError, RetentionResult};
pub use types::VenueKey;
pub use visit::VisitEvent;
