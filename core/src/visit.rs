//! Visit normalizer: raw events collapsed onto calendar days.
//!
//! A visitor who pays three times at a venue on the same day made one
//! visit that day. Everything downstream counts days, not events.

use crate::types::{UserId, VenueKey};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One raw visit as delivered by ingestion. Immutable input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub venue_chain_id: String,
    pub venue_id:       String,
    pub user_id:        UserId,
    pub timestamp:      NaiveDateTime,
}

impl VisitEvent {
    pub fn venue(&self) -> VenueKey {
        VenueKey::new(self.venue_chain_id.clone(), self.venue_id.clone())
    }

    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// A visitor was at a venue on a day. At most one per (venue, user, day).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DailyVisit {
    pub venue:   VenueKey,
    pub user_id: UserId,
    pub day:     NaiveDate,
}

/// Deduplicate events onto days.
///
/// Output is sorted by (venue, user, day), which is the order the gap
/// tracker requires. Input order does not matter.
pub fn normalize(events: &[VisitEvent]) -> Vec<DailyVisit> {
    let mut daily: Vec<DailyVisit> = events
        .iter()
        .map(|e| DailyVisit {
            venue:   e.venue(),
            user_id: e.user_id.clone(),
            day:     e.day(),
        })
        .collect();

    daily.sort_unstable();
    daily.dedup();

    log::debug!(
        "normalizer: {} events collapsed to {} daily visits",
        events.len(),
        daily.len()
    );
    daily
}
