//! Shared primitive types used across the entire pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A visitor identifier as it appears in the raw log.
pub type UserId = String;

/// The canonical run identifier.
pub type RunId = String;

/// A physical location. Chain and venue ids are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VenueKey {
    pub venue_chain_id: String,
    pub venue_id:       String,
}

impl VenueKey {
    pub fn new(venue_chain_id: impl Into<String>, venue_id: impl Into<String>) -> Self {
        Self {
            venue_chain_id: venue_chain_id.into(),
            venue_id:       venue_id.into(),
        }
    }
}

impl fmt::Display for VenueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.venue_chain_id, self.venue_id)
    }
}
