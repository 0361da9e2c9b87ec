use crate::{calendar::Month, types::VenueKey};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    #[error("Venue {venue}: month {month} folded after {last}")]
    OutOfOrderMonth { venue: VenueKey, month: Month, last: Month },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RetentionResult<T> = Result<T, RetentionError>;
