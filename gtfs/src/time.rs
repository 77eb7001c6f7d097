use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Seconds since midnight on the service day. GTFS schedules overnight service
/// past 24:00:00, so this is not a clock time and can exceed a day.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Time(u32);

impl Time {
    pub fn parse(x: &str) -> Result<Time> {
        let parts: Vec<&str> = x.split(':').collect();
        if parts.len() != 3 {
            bail!("Invalid time {x}");
        }
        let hours: u32 = parts[0].parse()?;
        let minutes: u32 = parts[1].parse()?;
        let seconds: u32 = parts[2].parse()?;
        if minutes >= 60 || seconds >= 60 {
            bail!("Invalid time {x}");
        }
        Ok(Time(hours * 3600 + minutes * 60 + seconds))
    }

    pub fn seconds_since_midnight(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 % 3600) / 60,
            self.0 % 60
        )
    }
}
