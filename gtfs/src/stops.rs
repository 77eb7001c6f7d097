use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StopID(String);

impl StopID {
    pub fn new<S: Into<String>>(x: S) -> Self {
        Self(x.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: StopID,
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

pub fn load<R: std::io::Read>(reader: R) -> Result<BTreeMap<StopID, Stop>> {
    let mut stops = BTreeMap::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        if stops.contains_key(&rec.stop_id) {
            bail!("Duplicate {:?}", rec.stop_id);
        }
        stops.insert(
            rec.stop_id.clone(),
            Stop {
                stop_id: rec.stop_id,
                code: rec.stop_code,
                name: rec.stop_name,
                description: rec.stop_desc,
            },
        );
    }
    Ok(stops)
}

#[derive(Deserialize)]
struct Record {
    stop_id: StopID,
    stop_code: Option<String>,
    stop_name: Option<String>,
    stop_desc: Option<String>,
    // Position columns are ignored; nothing here computes geometry
}
