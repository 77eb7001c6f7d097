use serde::{Deserialize, Serialize};

use crate::config::{DirectionConfig, RouteConfig};
use crate::error::NormalizeError;

/// One of the two canonical travel directions of a route; indexes into
/// `RouteConfig::directions`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirectionId(pub usize);

impl RouteConfig {
    /// Headsign fallback for routes without reference patterns. Routes with
    /// patterns never get here; the ordering engine decides their direction
    /// from the stops actually visited.
    pub fn classify_headsign(&self, trip: &gtfs::Trip) -> Result<DirectionId, NormalizeError> {
        let headsign = trip.headsign.as_deref().unwrap_or("");
        for (idx, direction) in self.directions.iter().enumerate() {
            if direction.matches_headsign(headsign) {
                return Ok(DirectionId(idx));
            }
        }
        Err(NormalizeError::UnclassifiableTrip {
            route: self.route_id,
            trip: trip.orig_id.as_str().to_string(),
            headsign: headsign.to_string(),
        })
    }
}

impl DirectionConfig {
    fn matches_headsign(&self, headsign: &str) -> bool {
        let headsign = headsign.to_lowercase();
        self.headsigns
            .iter()
            .any(|x| headsign.contains(&x.to_lowercase()))
    }
}
