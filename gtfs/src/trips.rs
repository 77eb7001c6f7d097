use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{orig, IDMapping, RouteID, ServiceID, StopTime, TripID};

#[derive(Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripID,
    pub orig_id: orig::TripID,
    pub route_id: RouteID,
    pub service_id: ServiceID,
    pub headsign: Option<String>,
    /// true is 0 in GTFS, false is 1. This flag is unreliable for some feeds;
    /// direction reconstruction happens downstream and never trusts it.
    pub outbound_direction: bool,

    pub stop_times: Vec<StopTime>,
}

pub fn load<R: std::io::Read>(reader: R) -> Result<(Vec<Trip>, IDMapping<orig::TripID, TripID>)> {
    let mut trips = Vec::new();
    let mut ids = IDMapping::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        let id = ids.insert_new(rec.trip_id.clone())?;
        trips.push(Trip {
            id,
            orig_id: rec.trip_id,
            route_id: rec.route_id,
            service_id: rec.service_id,
            headsign: rec.trip_headsign,
            outbound_direction: match rec.direction_id {
                Some(0) => true,
                Some(1) => false,
                // outbound_direction is just a hint, so if there's no direction, that's fine
                None => true,
                x => bail!("Unknown direction_id {:?}", x),
            },

            stop_times: Vec::new(),
        });
    }
    Ok((trips, ids))
}

#[derive(Deserialize)]
struct Record {
    trip_id: orig::TripID,
    route_id: RouteID,
    trip_headsign: Option<String>,
    direction_id: Option<usize>,
    service_id: ServiceID,
}

#[cfg(test)]
mod tests {
    use super::orig;

    #[test]
    fn load_trips() {
        let input = "trip_id,route_id,service_id,trip_headsign,direction_id\n\
                     T1,R1,WK,Downtown,0\n\
                     T2,R1,WK,Airport,1\n\
                     T3,R1,WK,,\n";
        let (trips, ids) = super::load(input.as_bytes()).unwrap();
        assert_eq!(trips.len(), 3);
        assert!(trips[0].outbound_direction);
        assert!(!trips[1].outbound_direction);
        assert_eq!(trips[2].headsign, None);
        assert_eq!(ids.lookup(&orig::TripID::new("T2")).unwrap(), trips[1].id);
    }

    #[test]
    fn duplicate_trip_id() {
        let input = "trip_id,route_id,service_id,trip_headsign,direction_id\n\
                     T1,R1,WK,Downtown,0\nT1,R1,WK,Downtown,0\n";
        assert!(super::load(input.as_bytes()).is_err());
    }
}
