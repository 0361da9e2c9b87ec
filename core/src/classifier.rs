//! Classifier: new / return / repeat for one venue-month.
//!
//! Visitors are compared against the venue's history as it stood at the
//! end of the previous month:
//!   - new:    no prior visits (or purged as non-returning)
//!   - return: exactly one prior visit day
//!   - repeat: two or more prior visit days
//!
//! The sentinel is never placed in a set. Its visit days for the month are
//! added to the `new` total instead.

use crate::{
    calendar::Month,
    cohort_accumulator::PriorHistory,
    config::RetentionConfig,
    monthly_aggregator::MonthActivity,
    types::{UserId, VenueKey},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedMonth {
    pub venue:     VenueKey,
    pub month:     Month,
    pub new:       BTreeSet<UserId>,
    pub returning: BTreeSet<UserId>,
    pub repeat:    BTreeSet<UserId>,
    /// Visit days attributed to the sentinel this month.
    pub sentinel_visits: u32,
}

impl ClassifiedMonth {
    /// Distinct new visitors plus the sentinel's visit days.
    pub fn new_count(&self) -> u64 {
        self.new.len() as u64 + u64::from(self.sentinel_visits)
    }

    pub fn return_count(&self) -> u64 { self.returning.len() as u64 }
    pub fn repeat_count(&self) -> u64 { self.repeat.len() as u64 }

    pub fn return_repeat_count(&self) -> u64 {
        self.return_count() + self.repeat_count()
    }

    /// Every non-sentinel visitor classified this month.
    pub fn visitors(&self) -> BTreeSet<&UserId> {
        self.new.iter().chain(&self.returning).chain(&self.repeat).collect()
    }
}

pub fn classify(
    venue: &VenueKey,
    month: Month,
    activity: &MonthActivity,
    prior: &impl PriorHistory,
    config: &RetentionConfig,
) -> ClassifiedMonth {
    let mut out = ClassifiedMonth {
        venue: venue.clone(),
        month,
        new: BTreeSet::new(),
        returning: BTreeSet::new(),
        repeat: BTreeSet::new(),
        sentinel_visits: 0,
    };

    for (user_id, &visits) in &activity.visitors {
        if config.is_sentinel(user_id) {
            out.sentinel_visits += visits;
            continue;
        }
        let target = match prior.prior_count(user_id) {
            0 => &mut out.new,
            1 => &mut out.returning,
            _ => &mut out.repeat,
        };
        target.insert(user_id.clone());
    }

    out
}
