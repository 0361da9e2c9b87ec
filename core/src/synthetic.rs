//! Synthetic visit logs for demos and tests.
//!
//! Every venue draws from its own deterministic stream. Visitors fall into
//! three profiles so every classification path gets traffic:
//!   - regular:    visits most months, sometimes on several days
//!   - occasional: turns up now and then
//!   - lapsing:    visits once early, disappears for over a year, comes back
//! The sentinel pays a few anonymous visits every month.

use crate::{
    calendar::Month,
    rng::VisitRng,
    visit::VisitEvent,
};
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub chains:           u32,
    pub venues_per_chain: u32,
    pub users_per_venue:  u32,
    pub first_month:      Month,
    pub months:           u32,
    pub regular_share:    f64,
    pub lapsing_share:    f64,
    /// Anonymous visits per venue-month.
    pub sentinel_visits:  u32,
    pub sentinel_user_id: String,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            chains:           2,
            venues_per_chain: 3,
            users_per_venue:  120,
            first_month:      Month::containing(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default()),
            months:           36,
            regular_share:    0.30,
            lapsing_share:    0.10,
            sentinel_visits:  5,
            sentinel_user_id: crate::config::DEFAULT_SENTINEL.into(),
        }
    }
}

#[derive(Clone, Copy)]
enum Profile {
    Regular,
    Occasional,
    Lapsing { back_after: u32 },
}

/// Generate the full log for `spec`. Same seed, same log.
pub fn generate(spec: &SyntheticSpec, seed: u64) -> Vec<VisitEvent> {
    let mut events = Vec::new();

    for chain in 0..spec.chains {
        for venue in 0..spec.venues_per_chain {
            let stream = u64::from(chain * spec.venues_per_chain + venue);
            let mut rng = VisitRng::new(seed, stream);
            let chain_id = format!("chain-{chain:02}");
            let venue_id = format!("venue-{chain:02}-{venue:02}");

            let profiles: Vec<Profile> = (0..spec.users_per_venue)
                .map(|_| {
                    let roll = rng.next_f64();
                    if roll < spec.regular_share {
                        Profile::Regular
                    } else if roll < spec.regular_share + spec.lapsing_share {
                        Profile::Lapsing { back_after: 15 + rng.next_u64_below(6) as u32 }
                    } else {
                        Profile::Occasional
                    }
                })
                .collect();

            let mut month = spec.first_month;
            for offset in 0..spec.months {
                for (user, profile) in profiles.iter().enumerate() {
                    let days = match *profile {
                        Profile::Regular if rng.chance(0.75) => 1 + rng.next_u64_below(3),
                        Profile::Occasional if rng.chance(0.12) => 1,
                        Profile::Lapsing { back_after } if offset == 0 || offset == back_after => 1,
                        _ => 0,
                    };
                    for _ in 0..days {
                        events.push(visit_at(&mut rng, &chain_id, &venue_id, &format!("user-{user:05}"), month));
                    }
                }
                for _ in 0..spec.sentinel_visits {
                    events.push(visit_at(&mut rng, &chain_id, &venue_id, &spec.sentinel_user_id, month));
                }
                month = month.succ();
            }
        }
    }

    log::debug!("synthetic: generated {} visit events (seed={seed})", events.len());
    events
}

fn visit_at(rng: &mut VisitRng, chain_id: &str, venue_id: &str, user_id: &str, month: Month) -> VisitEvent {
    let days_in_month = u64::from(month.end_date().day());
    let day = month.first_day() + chrono::Days::new(rng.next_u64_below(days_in_month));
    let hour = 8 + rng.next_u64_below(14) as u32;
    let minute = rng.next_u64_below(60) as u32;
    VisitEvent {
        venue_chain_id: chain_id.to_string(),
        venue_id:       venue_id.to_string(),
        user_id:        user_id.to_string(),
        timestamp:      day.and_hms_opt(hour, minute, 0).unwrap_or_default(),
    }
}
