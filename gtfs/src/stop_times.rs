use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{orig, IDMapping, StopID, Time, TripID};

#[derive(Clone, Serialize, Deserialize)]
pub struct StopTime {
    pub arrival_time: Time,
    pub departure_time: Time,
    pub stop_id: StopID,
    /// The feed-declared position within the trip. Kept because downstream
    /// ordering uses it as a last-resort tie-break; some feeds' sequence
    /// numbers contradict their own timestamps.
    pub stop_sequence: usize,
}

pub fn load<R: std::io::Read>(
    reader: R,
    trip_ids: &IDMapping<orig::TripID, TripID>,
) -> Result<BTreeMap<TripID, Vec<StopTime>>> {
    let mut stop_times: BTreeMap<TripID, Vec<StopTime>> = BTreeMap::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        let arrival_time = Time::parse(&rec.arrival_time)?;
        let departure_time = Time::parse(&rec.departure_time)?;
        if arrival_time > departure_time {
            bail!("Arrival time {arrival_time} is > departure time {departure_time}");
        }
        stop_times
            .entry(trip_ids.lookup(&rec.trip_id)?)
            .or_insert_with(Vec::new)
            .push(StopTime {
                arrival_time,
                departure_time,
                stop_id: rec.stop_id,
                stop_sequence: rec.stop_sequence,
            });
    }

    // Sort by stop_sequence, in case the file isn't in order
    for stops in stop_times.values_mut() {
        stops.sort_by_key(|st| st.stop_sequence);
    }
    Ok(stop_times)
}

#[derive(Deserialize)]
struct Record {
    trip_id: orig::TripID,
    arrival_time: String,
    departure_time: String,
    stop_id: StopID,
    stop_sequence: usize,
}

#[cfg(test)]
mod tests {
    use super::{orig, IDMapping, StopID, TripID};

    #[test]
    fn sorts_by_sequence() {
        let mut trip_ids: IDMapping<orig::TripID, TripID> = IDMapping::new();
        let t1 = trip_ids.insert_new(orig::TripID::new("T1")).unwrap();

        // Rows deliberately out of order
        let input = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                     T1,08:10:00,08:10:00,S2,2\n\
                     T1,08:00:00,08:00:30,S1,1\n\
                     T1,08:20:00,08:20:00,S3,3\n";
        let stop_times = super::load(input.as_bytes(), &trip_ids).unwrap();
        let list = &stop_times[&t1];
        assert_eq!(
            list.iter().map(|st| st.stop_id.clone()).collect::<Vec<_>>(),
            vec![StopID::new("S1"), StopID::new("S2"), StopID::new("S3")]
        );
        assert_eq!(list[0].stop_sequence, 1);
    }

    #[test]
    fn arrival_after_departure() {
        let mut trip_ids: IDMapping<orig::TripID, TripID> = IDMapping::new();
        trip_ids.insert_new(orig::TripID::new("T1")).unwrap();

        let input = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                     T1,08:10:00,08:00:00,S1,1\n";
        assert!(super::load(input.as_bytes(), &trip_ids).is_err());
    }

    #[test]
    fn unknown_trip() {
        let trip_ids: IDMapping<orig::TripID, TripID> = IDMapping::new();
        let input = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                     T9,08:00:00,08:00:00,S1,1\n";
        assert!(super::load(input.as_bytes(), &trip_ids).is_err());
    }
}
