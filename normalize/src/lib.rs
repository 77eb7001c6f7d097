#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod config;
mod direction;
mod error;
mod ids;
mod order;
mod split;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::Result;
use gtfs::GTFS;

pub use crate::config::{AgencyConfig, DirectionConfig, HeadsignMerge, RouteConfig, RouteFilter};
pub use crate::direction::DirectionId;
pub use crate::error::NormalizeError;
pub use crate::ids::{RouteId, StopId};
pub use crate::order::{Rank, ReferencePattern};
pub use crate::split::{NormalizedStopTime, NormalizedTrip, TripVariant};

/// Applies one agency's hand-maintained tables to a raw feed: route filtering
/// and identity, direction reconstruction, stop-time reordering. The tables
/// are immutable once built; any mismatch with the feed aborts the run.
pub struct Normalizer {
    config: AgencyConfig,
    // Compiled once per route with reference patterns
    patterns: BTreeMap<RouteId, [ReferencePattern; 2]>,
}

/// The normalized network handed to the exporter.
pub struct Network {
    pub agency_color: String,
    pub routes: BTreeMap<RouteId, NormalizedRoute>,
}

pub struct NormalizedRoute {
    pub route_id: RouteId,
    pub short_name: String,
    pub long_name: String,
    pub color: String,
    pub variants: Vec<TripVariant>,
}

impl Normalizer {
    pub fn new(config: AgencyConfig) -> Self {
        let mut patterns = BTreeMap::new();
        for (id, route) in &config.routes {
            if route.has_patterns() {
                patterns.insert(
                    *id,
                    [
                        ReferencePattern::new(route.directions[0].pattern.clone()),
                        ReferencePattern::new(route.directions[1].pattern.clone()),
                    ],
                );
            }
        }
        Self { config, patterns }
    }

    pub fn config(&self) -> &AgencyConfig {
        &self.config
    }

    pub fn normalize(&self, feed: &GTFS) -> Result<Network> {
        // Feed vendors have renumbered routes across releases, so several raw
        // routes can resolve to one configured route
        let mut grouped: BTreeMap<RouteId, Vec<&gtfs::Route>> = BTreeMap::new();
        for route in feed.routes.values() {
            if !self.config.filter.keep(route) {
                info!("Skipping {}", route.describe());
                continue;
            }
            grouped
                .entry(self.config.resolve_route(route)?.route_id)
                .or_insert_with(Vec::new)
                .push(route);
        }

        let mut routes = BTreeMap::new();
        for (route_id, raw_routes) in grouped {
            let cfg = &self.config.routes[&route_id];
            let variants = self.split_route(cfg, &raw_routes, feed)?;
            routes.insert(
                route_id,
                NormalizedRoute {
                    route_id,
                    short_name: cfg.short_name.clone(),
                    long_name: cfg.long_name.clone(),
                    color: cfg
                        .color
                        .clone()
                        .unwrap_or_else(|| self.config.agency_color.clone()),
                    variants,
                },
            );
        }

        Ok(Network {
            agency_color: self.config.agency_color.clone(),
            routes,
        })
    }

    /// Relative order of two stops in one direction of a route, for the
    /// exporter's merge of many trips into a single route-level ordering.
    /// None when the route has no reference patterns.
    pub fn compare_early(
        &self,
        route: RouteId,
        direction: DirectionId,
        a: StopId,
        b: StopId,
    ) -> Option<Ordering> {
        self.patterns
            .get(&route)
            .map(|patterns| patterns[direction.0].compare_early(a, b))
    }
}
