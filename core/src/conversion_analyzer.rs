//! Conversion analyzer: how long returning visitors took to come back.
//!
//! Each visitor in a month's `return` set is joined back to the gap
//! recorded on their returning visit (their first visit that month) and
//! counted in one of the latency buckets. Buckets are right-inclusive:
//! with the default edges a 90-day gap lands in (60, 90].

use crate::{
    calendar::Month,
    classifier::ClassifiedMonth,
    config::RetentionConfig,
    gap_tracker::GapRecord,
    types::{UserId, VenueKey},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyBins {
    edges: Vec<i64>,
}

impl LatencyBins {
    pub fn new(edges: Vec<i64>) -> Self {
        Self { edges }
    }

    pub fn from_config(config: &RetentionConfig) -> Self {
        Self::new(config.latency_bin_edges.clone())
    }

    pub fn count(&self) -> usize {
        self.edges.len() + 1
    }

    /// Index of the bucket holding `gap_days`.
    pub fn bucket(&self, gap_days: i64) -> usize {
        self.edges.partition_point(|&edge| edge < gap_days)
    }

    /// Interval labels, e.g. `(-inf, 30]`, `(30, 60]`, `(365, inf)`.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.count());
        let mut lower = "-inf".to_string();
        for edge in &self.edges {
            labels.push(format!("({lower}, {edge}]"));
            lower = edge.to_string();
        }
        labels.push(format!("({lower}, inf)"));
        labels
    }
}

/// Gap history per (venue, visitor), ascending by day.
#[derive(Debug, Default)]
pub struct GapIndex {
    by_visitor: HashMap<(VenueKey, UserId), Vec<(NaiveDate, Option<i64>)>>,
}

impl GapIndex {
    /// Build from gap records sorted by (venue, user, day).
    pub fn build(records: &[GapRecord]) -> Self {
        let mut by_visitor: HashMap<(VenueKey, UserId), Vec<(NaiveDate, Option<i64>)>> =
            HashMap::new();
        for r in records {
            by_visitor
                .entry((r.venue.clone(), r.user_id.clone()))
                .or_default()
                .push((r.day, r.gap_days));
        }
        Self { by_visitor }
    }

    /// The gap on the visitor's first visit in `month`. Falls back to the
    /// latest recorded gap up to the end of `month`.
    pub fn return_gap(&self, venue: &VenueKey, user_id: &str, month: Month) -> Option<i64> {
        let visits = self.by_visitor.get(&(venue.clone(), user_id.to_string()))?;

        let first_in_month = visits.partition_point(|(day, _)| *day < month.first_day());
        if let Some((day, Some(gap))) = visits.get(first_in_month) {
            if month.contains(*day) {
                return Some(*gap);
            }
        }

        let end = month.end_date();
        visits
            .iter()
            .rev()
            .filter(|(day, _)| *day <= end)
            .find_map(|(_, gap)| *gap)
    }
}

/// Latency histogram for one venue-month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRow {
    pub venue:  VenueKey,
    pub month:  Month,
    /// One count per bucket, in bucket order.
    pub counts: Vec<u64>,
}

impl ConversionRow {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// One row per venue-month with at least one returning visitor. Buckets
/// nobody fell into are zero-filled.
pub fn analyze(
    classified: &[ClassifiedMonth],
    index: &GapIndex,
    bins: &LatencyBins,
    config: &RetentionConfig,
) -> Vec<ConversionRow> {
    classified
        .iter()
        .filter(|cm| !cm.returning.is_empty())
        .map(|cm| {
            let mut counts = vec![0u64; bins.count()];
            for user_id in cm.returning.iter().filter(|u| !config.is_sentinel(u)) {
                match index.return_gap(&cm.venue, user_id, cm.month) {
                    Some(gap) => counts[bins.bucket(gap)] += 1,
                    None => log::warn!(
                        "conversion: no gap recorded for returning {} at {} in {}",
                        user_id, cm.venue, cm.month,
                    ),
                }
            }
            ConversionRow {
                venue: cm.venue.clone(),
                month: cm.month,
                counts,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_are_right_inclusive() {
        let bins = LatencyBins::new(vec![30, 60, 90, 180, 365]);
        assert_eq!(bins.bucket(1), 0);
        assert_eq!(bins.bucket(30), 0);
        assert_eq!(bins.bucket(31), 1);
        assert_eq!(bins.bucket(90), 2);
        assert_eq!(bins.bucket(365), 4);
        assert_eq!(bins.bucket(366), 5);
        assert_eq!(bins.count(), 6);
    }

    fn gap(user: &str, day: &str, gap_days: Option<i64>) -> GapRecord {
        GapRecord {
            venue:      VenueKey::new("c", "v"),
            user_id:    user.into(),
            day:        NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(),
            gap_days,
            non_return: false,
        }
    }

    #[test]
    fn return_gap_prefers_first_visit_of_the_month() {
        let index = GapIndex::build(&[
            gap("a", "2024-01-05", None),
            gap("a", "2024-03-02", Some(57)),
            gap("a", "2024-03-20", Some(18)),
        ]);
        let venue = VenueKey::new("c", "v");
        assert_eq!(index.return_gap(&venue, "a", Month::new(2024, 3).unwrap()), Some(57));
    }

    #[test]
    fn return_gap_falls_back_to_latest_gap_up_to_month_end() {
        let index = GapIndex::build(&[
            gap("a", "2024-01-05", Some(40)),
            gap("a", "2024-02-10", None),
            gap("a", "2024-02-25", Some(15)),
            gap("a", "2024-04-01", Some(36)),
        ]);
        let venue = VenueKey::new("c", "v");

        // First February visit has no gap: the later one in the month wins.
        assert_eq!(index.return_gap(&venue, "a", Month::new(2024, 2).unwrap()), Some(15));
        // No visit in March: the latest gap before its end.
        assert_eq!(index.return_gap(&venue, "a", Month::new(2024, 3).unwrap()), Some(15));
        assert_eq!(index.return_gap(&venue, "b", Month::new(2024, 3).unwrap()), None);
    }

    #[test]
    fn labels_cover_the_open_ends() {
        let labels = LatencyBins::new(vec![30, 60]).labels();
        assert_eq!(labels, vec!["(-inf, 30]", "(30, 60]", "(60, inf)"]);
        assert_eq!(LatencyBins::new(Vec::new()).labels(), vec!["(-inf, inf)"]);
    }
}
