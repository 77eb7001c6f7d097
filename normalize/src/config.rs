use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::ids::{RouteId, StopId};

/// Hand-maintained tables for one agency: which routes to keep, how raw codes
/// become canonical IDs, display styling, and the reference stop patterns.
/// Loaded once at startup and immutable afterwards; every release of the feed
/// has to stay consistent with these tables or the run aborts.
pub struct AgencyConfig {
    pub agency_color: String,
    pub filter: RouteFilter,
    pub routes: BTreeMap<RouteId, RouteConfig>,

    strip_prefix_re: Regex,
    // Keys lowercased
    stop_overrides: BTreeMap<String, StopId>,
    aliases: BTreeMap<String, RouteId>,
}

/// Which raw routes belong to this agency at all. The regional feed mixes
/// several operators into one file.
#[derive(Deserialize)]
pub struct RouteFilter {
    /// Keep a route when its agency ID contains one of these.
    pub agencies: Vec<String>,
    /// One region-wide agency whose routes are kept only when the short name
    /// is listed below.
    #[serde(default)]
    pub shared_agency_prefix: Option<String>,
    #[serde(default)]
    pub shared_agency_short_names: Vec<String>,
    /// When non-empty, the route ID or long name must also contain one of
    /// these markers.
    #[serde(default)]
    pub route_markers: Vec<String>,
}

pub struct RouteConfig {
    pub route_id: RouteId,
    pub short_name: String,
    pub long_name: String,
    /// None means the agency color
    pub color: Option<String>,
    /// Raw feed short names that resolve to this route, besides the canonical
    /// short name itself. Feed vendors have renumbered routes across releases.
    pub aliases: Vec<String>,
    pub directions: [DirectionConfig; 2],
    pub headsign_merges: Vec<HeadsignMerge>,
}

pub struct DirectionConfig {
    pub name: String,
    /// The hand-authored reference path for this direction, as canonical stop
    /// IDs. Either both of a route's directions carry one or neither does.
    pub pattern: Vec<StopId>,
    /// Headsign substrings classifying trips onto this direction, for routes
    /// without reference patterns.
    pub headsigns: Vec<String>,
}

#[derive(Clone, Deserialize)]
pub struct HeadsignMerge {
    pub canonical: String,
    pub matches: Vec<String>,
}

impl RouteFilter {
    pub fn keep(&self, route: &gtfs::Route) -> bool {
        let agency = route.agency_id.as_deref().unwrap_or("");
        if let Some(prefix) = &self.shared_agency_prefix {
            if agency.starts_with(prefix.as_str()) {
                let short = route.short_name.as_deref().unwrap_or("");
                return self
                    .shared_agency_short_names
                    .iter()
                    .any(|x| x.eq_ignore_ascii_case(short));
            }
        }
        if !self.agencies.iter().any(|x| agency.contains(x.as_str())) {
            return false;
        }
        if self.route_markers.is_empty() {
            return true;
        }
        let long_name = route.long_name.as_deref().unwrap_or("");
        self.route_markers
            .iter()
            .any(|m| route.route_id.as_str().contains(m.as_str()) || long_name.contains(m.as_str()))
    }
}

impl RouteConfig {
    pub fn has_patterns(&self) -> bool {
        !self.directions[0].pattern.is_empty()
    }
}

impl HeadsignMerge {
    pub fn covers(&self, a: &str, b: &str) -> bool {
        self.matches.iter().any(|x| x == a) && self.matches.iter().any(|x| x == b)
    }
}

impl AgencyConfig {
    pub fn load<R: std::io::Read>(reader: R) -> Result<Self> {
        let raw: RawConfig = serde_json::from_reader(reader)?;

        let strip_prefix_re = RegexBuilder::new(&raw.strip_prefix)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("bad strip_prefix {:?}", raw.strip_prefix))?;

        let mut stop_overrides = BTreeMap::new();
        for (code, id) in raw.stop_overrides {
            if stop_overrides.insert(code.to_lowercase(), StopId(id)).is_some() {
                bail!("Duplicate stop override {code:?}");
            }
        }

        let mut routes = BTreeMap::new();
        let mut aliases = BTreeMap::new();
        for route in raw.routes {
            let route_id = RouteId(route.id);
            let [d0, d1]: [RawDirection; 2] = route
                .directions
                .try_into()
                .map_err(|_| anyhow!("Route {route_id} needs exactly two directions"))?;
            if d0.pattern.is_empty() != d1.pattern.is_empty() {
                bail!("Route {route_id} has a reference pattern for only one direction");
            }

            for alias in route.aliases.iter().chain([&route.short_name]) {
                if aliases.insert(alias.to_lowercase(), route_id).is_some() {
                    bail!("Route short name {alias:?} maps to multiple routes");
                }
            }

            for merge in &route.headsign_merges {
                if !merge.matches.iter().any(|x| x == &merge.canonical) {
                    bail!(
                        "Route {route_id}: merge canonical {:?} isn't one of its matches",
                        merge.canonical
                    );
                }
            }

            let cfg = RouteConfig {
                route_id,
                short_name: route.short_name,
                long_name: route.long_name,
                color: route.color,
                aliases: route.aliases,
                directions: [d0.build(), d1.build()],
                headsign_merges: route.headsign_merges,
            };
            if routes.insert(route_id, cfg).is_some() {
                bail!("Duplicate route {route_id}");
            }
        }

        Ok(Self {
            agency_color: raw.agency_color,
            filter: raw.filter,
            routes,
            strip_prefix_re,
            stop_overrides,
            aliases,
        })
    }

    pub(crate) fn strip_prefix(&self, raw: &str) -> String {
        self.strip_prefix_re.replace(raw, "").into_owned()
    }

    pub(crate) fn stop_override(&self, stripped: &str) -> Option<StopId> {
        self.stop_overrides.get(&stripped.to_lowercase()).copied()
    }

    /// Finds the configured route a raw feed route belongs to: by the number
    /// embedded in its route ID when there is one, else by short name.
    pub fn resolve_route(&self, route: &gtfs::Route) -> Result<&RouteConfig, crate::NormalizeError> {
        if let Some(n) = self.numeric_route_id(route.route_id.as_str()) {
            if let Some(cfg) = self.routes.get(&RouteId(n)) {
                return Ok(cfg);
            }
        }
        if let Some(short) = &route.short_name {
            if let Some(id) = self.aliases.get(&short.to_lowercase()) {
                return Ok(&self.routes[id]);
            }
        }
        Err(crate::NormalizeError::UnrecognizedIdentifier {
            code: route.route_id.as_str().to_string(),
        })
    }
}

#[derive(Deserialize)]
struct RawConfig {
    agency_color: String,
    strip_prefix: String,
    filter: RouteFilter,
    #[serde(default)]
    stop_overrides: BTreeMap<String, u32>,
    routes: Vec<RawRoute>,
}

#[derive(Deserialize)]
struct RawRoute {
    id: u32,
    short_name: String,
    long_name: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    directions: Vec<RawDirection>,
    #[serde(default)]
    headsign_merges: Vec<HeadsignMerge>,
}

#[derive(Deserialize)]
struct RawDirection {
    name: String,
    #[serde(default)]
    pattern: Vec<u32>,
    #[serde(default)]
    headsigns: Vec<String>,
}

impl RawDirection {
    fn build(self) -> DirectionConfig {
        DirectionConfig {
            name: self.name,
            pattern: self.pattern.into_iter().map(StopId).collect(),
            headsigns: self.headsigns,
        }
    }
}
