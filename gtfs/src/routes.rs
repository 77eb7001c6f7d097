use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::Trip;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteID(String);

impl RouteID {
    pub fn new<S: Into<String>>(x: S) -> Self {
        Self(x.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Route {
    pub route_id: RouteID,
    pub agency_id: Option<String>,
    pub route_type: RouteType,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub description: Option<String>,

    // Sorted by the first stop time, attached after loading
    pub trips: Vec<Trip>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum RouteType {
    Tram = 0,
    Subway = 1,
    Rail = 2,
    Bus = 3,
    Ferry = 4,
    CableTram = 5,
    AerialLift = 6,
    Furnicular = 7,
    Trolleybus = 11,
    Monorail = 12,
}

impl Route {
    pub fn describe(&self) -> String {
        let name = self
            .short_name
            .as_ref()
            .or(self.long_name.as_ref())
            .or(self.description.as_ref())
            .map(|x| x.to_string())
            .unwrap_or_else(|| format!("{:?}", self.route_id));
        format!("{name} ({:?})", self.route_type)
    }
}

pub fn load<R: std::io::Read>(reader: R) -> Result<BTreeMap<RouteID, Route>> {
    let mut routes = BTreeMap::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        if routes.contains_key(&rec.route_id) {
            bail!("Duplicate {:?}", rec.route_id);
        }
        routes.insert(
            rec.route_id.clone(),
            Route {
                route_id: rec.route_id,
                agency_id: rec.agency_id,
                route_type: rec.route_type,
                short_name: rec.route_short_name,
                long_name: rec.route_long_name,
                description: rec.route_desc,

                trips: Vec::new(),
            },
        );
    }
    Ok(routes)
}

#[derive(Deserialize)]
struct Record {
    route_id: RouteID,
    agency_id: Option<String>,
    route_type: RouteType,
    route_short_name: Option<String>,
    route_long_name: Option<String>,
    route_desc: Option<String>,
}
