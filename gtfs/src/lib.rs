#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod calendar;
mod ids;
pub mod routes;
pub mod stop_times;
pub mod stops;
mod time;
pub mod trips;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use zip::ZipArchive;

pub use calendar::{Calendar, DaysOfWeek, Service, ServiceID};
pub use ids::{orig, CheapID, IDMapping, TripID};
pub use routes::{Route, RouteID, RouteType};
pub use stop_times::StopTime;
pub use stops::{Stop, StopID};
pub use time::Time;
pub use trips::Trip;

#[derive(Clone, Serialize, Deserialize)]
pub struct GTFS {
    pub stops: BTreeMap<StopID, Stop>,
    pub routes: BTreeMap<RouteID, Route>,
    pub calendar: Calendar,
}

impl GTFS {
    pub fn load_from_zip<R: std::io::Read + std::io::Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<Self> {
        let mut gtfs = Self::empty();
        gtfs.stops = stops::load(get_zip_file(archive, "stops.txt")?)?;
        gtfs.routes = routes::load(get_zip_file(archive, "routes.txt")?)?;

        let (trips, trip_ids) = trips::load(get_zip_file(archive, "trips.txt")?)?;
        let mut stop_times = stop_times::load(get_zip_file(archive, "stop_times.txt")?, &trip_ids)?;

        let mut trips_per_route: BTreeMap<RouteID, Vec<Trip>> = BTreeMap::new();
        for mut trip in trips {
            trip.stop_times = match stop_times.remove(&trip.id) {
                Some(list) => list,
                None => bail!("Trip {:?} has no stop times", trip.orig_id),
            };
            for st in &trip.stop_times {
                if !gtfs.stops.contains_key(&st.stop_id) {
                    bail!("Trip {:?} visits unknown {:?}", trip.orig_id, st.stop_id);
                }
            }
            trips_per_route
                .entry(trip.route_id.clone())
                .or_insert_with(Vec::new)
                .push(trip);
        }

        if !stop_times.is_empty() {
            warn!(
                "Stop times defined for unknown trips: {:?}",
                stop_times.keys()
            );
        }

        let mut empty = Vec::new();
        for route in gtfs.routes.values_mut() {
            if let Some(mut trips) = trips_per_route.remove(&route.route_id) {
                trips.sort_by_key(|t| t.stop_times[0].arrival_time);
                route.trips = trips;
            } else {
                empty.push(route.route_id.clone());
            }
        }
        for id in empty {
            info!("Dropping {:?}, it has no trips", id);
            gtfs.routes.remove(&id).unwrap();
        }

        gtfs.calendar = calendar::load(get_zip_file(archive, "calendar.txt")?)?;
        if let Ok(file) = get_zip_file(archive, "calendar_dates.txt") {
            calendar::load_exceptions(&mut gtfs.calendar, file)?;
        }

        Ok(gtfs)
    }

    pub fn empty() -> Self {
        Self {
            stops: BTreeMap::new(),
            routes: BTreeMap::new(),
            calendar: Calendar {
                services: BTreeMap::new(),
            },
        }
    }
}

// Adds the path in the error message
pub fn get_zip_file<'a, R: std::io::Read + std::io::Seek>(
    archive: &'a mut ZipArchive<R>,
    path: &str,
) -> Result<zip::read::ZipFile<'a>> {
    archive
        .by_name(path)
        .map_err(|err| anyhow!("{path}: {err}"))
}
