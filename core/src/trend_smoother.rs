//! Trend smoother: trailing means of new and returning visitors.
//!
//! The window counts observed rows, not calendar months: a venue that was
//! closed for a month simply has one row fewer. A row is emitted only once
//! its window is full.

use crate::{
    calendar::Month,
    classifier::ClassifiedMonth,
    types::VenueKey,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One row of the stats table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub venue:           VenueKey,
    pub month:           Month,
    pub new:             u64,
    pub returning:       u64,
    pub repeat:          u64,
    pub new_12m_mean:    f64,
    pub return_12m_mean: f64,
}

/// `classified` must be sorted by (venue, month).
pub fn smooth(classified: &[ClassifiedMonth], window: usize) -> Vec<TrendPoint> {
    let mut out = Vec::new();
    if window == 0 {
        return out;
    }

    let mut current: Option<&VenueKey> = None;
    let mut trail: VecDeque<(u64, u64)> = VecDeque::with_capacity(window);
    let mut new_sum = 0u64;
    let mut rr_sum = 0u64;

    for cm in classified {
        if current != Some(&cm.venue) {
            current = Some(&cm.venue);
            trail.clear();
            new_sum = 0;
            rr_sum = 0;
        }

        let obs = (cm.new_count(), cm.return_repeat_count());
        trail.push_back(obs);
        new_sum += obs.0;
        rr_sum += obs.1;
        if trail.len() > window {
            if let Some((n, r)) = trail.pop_front() {
                new_sum -= n;
                rr_sum -= r;
            }
        }

        if trail.len() == window {
            out.push(TrendPoint {
                venue:           cm.venue.clone(),
                month:           cm.month,
                new:             cm.new_count(),
                returning:       cm.return_count(),
                repeat:          cm.repeat_count(),
                new_12m_mean:    new_sum as f64 / window as f64,
                return_12m_mean: rr_sum as f64 / window as f64,
            });
        }
    }

    out
}
