//! Monthly aggregator: daily visits rolled up per venue, month and visitor.
//!
//! Produces two things per venue-month:
//!   1. visit-day counts for every visitor seen that month
//!   2. the non-return set: visitors with at least one flagged visit in
//!      that month. The cohort fold purges them after folding the month.

use crate::{
    calendar::Month,
    gap_tracker::GapRecord,
    types::{UserId, VenueKey},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One row of the flat monthly table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyVisitorCount {
    pub venue:       VenueKey,
    pub month:       Month,
    pub user_id:     UserId,
    pub visit_count: u32,
}

/// What happened at one venue in one month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthActivity {
    /// Distinct visit days per visitor.
    pub visitors:      BTreeMap<UserId, u32>,
    pub non_returning: BTreeSet<UserId>,
}

/// A venue's observed months, ascending. Months with no visits are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VenueHistory {
    pub months: BTreeMap<Month, MonthActivity>,
}

pub type MonthlyHistories = BTreeMap<VenueKey, VenueHistory>;

/// Group gap records (one per daily visit) by venue and month.
pub fn aggregate_monthly(records: &[GapRecord]) -> MonthlyHistories {
    let mut venues = MonthlyHistories::new();

    for r in records {
        let activity = venues
            .entry(r.venue.clone())
            .or_default()
            .months
            .entry(Month::containing(r.day))
            .or_default();

        *activity.visitors.entry(r.user_id.clone()).or_insert(0) += 1;
        if r.non_return {
            activity.non_returning.insert(r.user_id.clone());
        }
    }

    log::debug!(
        "aggregator: {} venues, {} venue-months",
        venues.len(),
        venues.values().map(|v| v.months.len()).sum::<usize>()
    );
    venues
}

/// Flatten the histories into the (venue, month, user) table.
pub fn monthly_counts(histories: &MonthlyHistories) -> Vec<MonthlyVisitorCount> {
    histories
        .iter()
        .flat_map(|(venue, history)| {
            history.months.iter().flat_map(move |(month, activity)| {
                activity.visitors.iter().map(move |(user_id, &visit_count)| {
                    MonthlyVisitorCount {
                        venue: venue.clone(),
                        month: *month,
                        user_id: user_id.clone(),
                        visit_count,
                    }
                })
            })
        })
        .collect()
}
