use crate::error::{RetentionError, RetentionResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SENTINEL: &str = "CASH";

/// Tunables for a retention run.
///
/// Loaded from a JSON file; any field left out takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Placeholder id for unidentified payers. Never classified as
    /// return/repeat and never flagged non-returning.
    pub sentinel_user_id: String,
    /// A visit whose gap since the previous visit exceeds this many days
    /// marks the visitor as non-returning.
    pub non_return_threshold_days: i64,
    /// Right-inclusive upper edges of the latency buckets. The last bucket
    /// is open-ended, so there are `edges + 1` buckets in total.
    pub latency_bin_edges: Vec<i64>,
    /// Trailing observations per rolling mean; also the minimum required.
    pub rolling_window: usize,
    /// Keep a JSON copy of every venue's cohort map after each month.
    pub persist_cohort_snapshots: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            sentinel_user_id:          DEFAULT_SENTINEL.into(),
            non_return_threshold_days: 365,
            latency_bin_edges:         vec![30, 60, 90, 180, 365],
            rolling_window:            12,
            persist_cohort_snapshots:  false,
        }
    }
}

impl RetentionConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    /// In tests, use RetentionConfig::default().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: RetentionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RetentionResult<()> {
        if self.sentinel_user_id.trim().is_empty() {
            return Err(RetentionError::InvalidConfig(
                "sentinel_user_id must not be empty".into(),
            ));
        }
        if self.non_return_threshold_days <= 0 {
            return Err(RetentionError::InvalidConfig(format!(
                "non_return_threshold_days must be positive, got {}",
                self.non_return_threshold_days
            )));
        }
        if self.rolling_window == 0 {
            return Err(RetentionError::InvalidConfig(
                "rolling_window must be at least 1".into(),
            ));
        }
        if self.latency_bin_edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RetentionError::InvalidConfig(format!(
                "latency_bin_edges must be strictly ascending, got {:?}",
                self.latency_bin_edges
            )));
        }
        Ok(())
    }

    pub fn is_sentinel(&self, user_id: &str) -> bool {
        user_id == self.sentinel_user_id
    }
}
