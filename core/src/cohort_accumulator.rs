//! Cohort accumulator: the expanding visit history of one venue.
//!
//! RULES:
//!   - One accumulator per venue, built empty at the venue's first month
//!     and dropped when the venue's pass ends. Nothing is shared across
//!     venues.
//!   - Months are folded strictly in ascending order. Folding a month at or
//!     before the last folded month is an error.
//!   - Folding month m adds every visitor's visit days for m, then deletes
//!     m's non-returning visitors. Their m visits were counted; their
//!     history does not survive into m+1.
//!   - Between two folds the accumulator IS the cohort state at the end of
//!     the last folded month. Classifying month m before folding it is what
//!     gives the one-month lag.

use crate::{
    calendar::Month,
    error::{RetentionError, RetentionResult},
    monthly_aggregator::MonthActivity,
    types::{UserId, VenueKey},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Read access to a venue's history as of the end of some month.
pub trait PriorHistory {
    /// Cumulative visit days for `user_id`, 0 when absent.
    fn prior_count(&self, user_id: &str) -> u64;
}

/// An immutable copy of the cohort map keyed to the month it closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortSnapshot {
    pub venue:  VenueKey,
    pub month:  Month,
    pub counts: BTreeMap<UserId, u64>,
}

impl PriorHistory for CohortSnapshot {
    fn prior_count(&self, user_id: &str) -> u64 {
        self.counts.get(user_id).copied().unwrap_or(0)
    }
}

pub struct CohortAccumulator {
    venue:      VenueKey,
    acc:        HashMap<UserId, u64>,
    last_month: Option<Month>,
    peak_size:  usize,
    purged:     usize,
}

impl CohortAccumulator {
    pub fn new(venue: VenueKey) -> Self {
        Self {
            venue,
            acc: HashMap::new(),
            last_month: None,
            peak_size: 0,
            purged: 0,
        }
    }

    pub fn venue(&self) -> &VenueKey { &self.venue }
    pub fn last_month(&self) -> Option<Month> { self.last_month }
    pub fn len(&self) -> usize { self.acc.len() }
    pub fn is_empty(&self) -> bool { self.acc.is_empty() }

    /// Largest cohort size seen after any fold.
    pub fn peak_size(&self) -> usize { self.peak_size }

    /// Total purge deletions across all folds.
    pub fn purged(&self) -> usize { self.purged }

    /// Fold one month into the history.
    pub fn fold_month(&mut self, month: Month, activity: &MonthActivity) -> RetentionResult<()> {
        if let Some(last) = self.last_month {
            if month <= last {
                return Err(RetentionError::OutOfOrderMonth {
                    venue: self.venue.clone(),
                    month,
                    last,
                });
            }
        }

        for (user_id, &visits) in &activity.visitors {
            *self.acc.entry(user_id.clone()).or_insert(0) += u64::from(visits);
        }
        self.peak_size = self.peak_size.max(self.acc.len());

        for user_id in &activity.non_returning {
            if self.acc.remove(user_id).is_some() {
                self.purged += 1;
            }
        }

        self.last_month = Some(month);
        Ok(())
    }

    /// Copy of the current state, keyed to the last folded month.
    /// `None` before the first fold.
    pub fn snapshot(&self) -> Option<CohortSnapshot> {
        let month = self.last_month?;
        Some(CohortSnapshot {
            venue:  self.venue.clone(),
            month,
            counts: self.acc.iter().map(|(k, &v)| (k.clone(), v)).collect(),
        })
    }
}

impl PriorHistory for CohortAccumulator {
    fn prior_count(&self, user_id: &str) -> u64 {
        self.acc.get(user_id).copied().unwrap_or(0)
    }
}
