//! Inter-visit gap tracker.
//!
//! For every daily visit, the number of days since the same visitor's
//! previous visit to the same venue. A gap above the configured threshold
//! flags the visit as non-returning: the visitor had gone for good and
//! their earlier history no longer counts.

use crate::{
    config::RetentionConfig,
    types::{UserId, VenueKey},
    visit::DailyVisit,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRecord {
    pub venue:      VenueKey,
    pub user_id:    UserId,
    pub day:        NaiveDate,
    /// `None` on the visitor's first visit at this venue.
    pub gap_days:   Option<i64>,
    pub non_return: bool,
}

/// True iff the visit ends an absence long enough to count as churn.
/// The sentinel is never flagged, whatever its gap.
pub fn is_non_return(user_id: &str, gap_days: Option<i64>, config: &RetentionConfig) -> bool {
    !config.is_sentinel(user_id)
        && gap_days.is_some_and(|g| g > config.non_return_threshold_days)
}

/// Compute gaps over daily visits sorted by (venue, user, day).
///
/// One record per input visit, in input order.
pub fn track_gaps(daily: &[DailyVisit], config: &RetentionConfig) -> Vec<GapRecord> {
    let mut out = Vec::with_capacity(daily.len());
    let mut previous: Option<&DailyVisit> = None;

    for visit in daily {
        let gap_days = match previous {
            Some(prev) if prev.venue == visit.venue && prev.user_id == visit.user_id => {
                Some((visit.day - prev.day).num_days())
            }
            _ => None,
        };
        debug_assert!(gap_days.map_or(true, |g| g > 0), "daily visits must be sorted and unique");

        let non_return = is_non_return(&visit.user_id, gap_days, config);
        if non_return {
            log::trace!(
                "gap: {} non-returning at {} on {} (gap={:?})",
                visit.user_id, visit.venue, visit.day, gap_days,
            );
        }

        out.push(GapRecord {
            venue: visit.venue.clone(),
            user_id: visit.user_id.clone(),
            day: visit.day,
            gap_days,
            non_return,
        });
        previous = Some(visit);
    }

    out
}
