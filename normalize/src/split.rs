use gtfs::{StopTime, Time, GTFS};

use crate::config::RouteConfig;
use crate::direction::DirectionId;
use crate::error::NormalizeError;
use crate::ids::StopId;
use crate::order::{match_direction, Rank};
use crate::Normalizer;

/// A trip re-tagged with its derived direction, its stop times reordered and
/// renumbered. Scheduled times are untouched; no stop is invented or dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedTrip {
    pub orig_id: gtfs::orig::TripID,
    pub direction: DirectionId,
    pub headsign: String,
    pub stop_times: Vec<NormalizedStopTime>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedStopTime {
    pub stop: StopId,
    pub arrival_time: Time,
    pub departure_time: Time,
    pub stop_sequence: usize,
}

/// One direction's share of a route's trips.
#[derive(Debug)]
pub struct TripVariant {
    pub direction: DirectionId,
    pub headsign: String,
    pub trips: Vec<NormalizedTrip>,
}

impl Normalizer {
    /// Splits every trip of a route (possibly spread over several raw feed
    /// routes) into the route's two directions. Pattern routes go through the
    /// ordering engine; the rest classify by headsign and keep their feed
    /// order.
    pub(crate) fn split_route(
        &self,
        cfg: &RouteConfig,
        raw_routes: &[&gtfs::Route],
        feed: &GTFS,
    ) -> Result<Vec<TripVariant>, NormalizeError> {
        let mut variants: Vec<TripVariant> = cfg
            .directions
            .iter()
            .enumerate()
            .map(|(idx, direction)| TripVariant {
                direction: DirectionId(idx),
                headsign: direction.name.clone(),
                trips: Vec::new(),
            })
            .collect();

        for route in raw_routes {
            for trip in &route.trips {
                let observed = self.canonical_stops(trip, feed)?;
                if let Some(patterns) = self.patterns.get(&cfg.route_id) {
                    let (direction, resolution) =
                        match_direction(patterns, &observed).map_err(|(d, backtrack)| {
                            NormalizeError::UnresolvableStopOrder {
                                route: cfg.route_id,
                                direction: cfg.directions[d].name.clone(),
                                stop: backtrack.stop,
                            }
                        })?;
                    variants[direction].trips.push(NormalizedTrip {
                        orig_id: trip.orig_id.clone(),
                        direction: DirectionId(direction),
                        headsign: cfg.directions[direction].name.clone(),
                        stop_times: reorder_stop_times(
                            &trip.stop_times,
                            &observed,
                            &resolution.ranks,
                        ),
                    });
                } else {
                    let direction = cfg.classify_headsign(trip)?;
                    let stop_times = trip
                        .stop_times
                        .iter()
                        .zip(&observed)
                        .enumerate()
                        .map(|(idx, (st, (stop, _)))| NormalizedStopTime {
                            stop: *stop,
                            arrival_time: st.arrival_time,
                            departure_time: st.departure_time,
                            stop_sequence: idx + 1,
                        })
                        .collect();
                    let headsign = trip
                        .headsign
                        .clone()
                        .unwrap_or_else(|| cfg.directions[direction.0].name.clone());
                    variants[direction.0].trips.push(NormalizedTrip {
                        orig_id: trip.orig_id.clone(),
                        direction,
                        headsign,
                        stop_times,
                    });
                }
            }
        }

        // For headsign-classified routes, the variant's display headsign folds
        // the trips' headsigns through the merge table
        if !cfg.has_patterns() {
            for variant in &mut variants {
                if let Some(first) = variant.trips.first() {
                    let mut merged = first.headsign.clone();
                    for trip in &variant.trips[1..] {
                        merged = merge_headsigns(cfg, merged, &trip.headsign)?;
                    }
                    variant.headsign = merged;
                }
            }
        }

        Ok(variants)
    }

    fn canonical_stops(
        &self,
        trip: &gtfs::Trip,
        feed: &GTFS,
    ) -> Result<Vec<(StopId, Time)>, NormalizeError> {
        let mut result = Vec::with_capacity(trip.stop_times.len());
        for st in &trip.stop_times {
            let stop = feed.stops.get(&st.stop_id).ok_or_else(|| {
                NormalizeError::UnrecognizedIdentifier {
                    code: st.stop_id.as_str().to_string(),
                }
            })?;
            result.push((self.config().stop_id(stop)?, st.arrival_time));
        }
        Ok(result)
    }
}

fn reorder_stop_times(
    stop_times: &[StopTime],
    observed: &[(StopId, Time)],
    ranks: &[Rank],
) -> Vec<NormalizedStopTime> {
    let mut order: Vec<usize> = (0..stop_times.len()).collect();
    order.sort_by_key(|&i| (ranks[i], stop_times[i].arrival_time, stop_times[i].stop_sequence));
    order
        .into_iter()
        .enumerate()
        .map(|(seq, i)| NormalizedStopTime {
            stop: observed[i].0,
            arrival_time: stop_times[i].arrival_time,
            departure_time: stop_times[i].departure_time,
            stop_sequence: seq + 1,
        })
        .collect()
}

fn merge_headsigns(
    cfg: &RouteConfig,
    current: String,
    next: &str,
) -> Result<String, NormalizeError> {
    if current == next {
        return Ok(current);
    }
    for merge in &cfg.headsign_merges {
        if merge.covers(&current, next) {
            return Ok(merge.canonical.clone());
        }
    }
    Err(NormalizeError::UnmergeableHeadsignPair {
        route: cfg.route_id,
        first: current,
        second: next.to_string(),
    })
}
