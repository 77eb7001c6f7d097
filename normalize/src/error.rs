use thiserror::Error;

use crate::ids::{RouteId, StopId};

/// A mismatch between the hand-maintained agency tables and the feed. Every
/// variant is fatal: the tables must be corrected before any output is
/// trustworthy, so the whole run aborts instead of skipping the record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("no rule to normalize identifier {code:?}")]
    UnrecognizedIdentifier { code: String },

    #[error("route {route}, trip {trip}: no direction rule matches headsign {headsign:?}")]
    UnclassifiableTrip {
        route: RouteId,
        trip: String,
        headsign: String,
    },

    #[error("route {route}, {direction}: stop {stop} can't be ordered against the reference pattern")]
    UnresolvableStopOrder {
        route: RouteId,
        direction: String,
        stop: StopId,
    },

    #[error("route {route}: headsigns {first:?} and {second:?} have no merge rule")]
    UnmergeableHeadsignPair {
        route: RouteId,
        first: String,
        second: String,
    },
}
