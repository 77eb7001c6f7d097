use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::AgencyConfig;
use crate::error::NormalizeError;

/// Canonical numeric stop identifier, stable across feed releases. Reference
/// patterns are written in terms of these, so the derivation rules here must
/// not change between releases without updating the patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StopId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteId(pub u32);

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

lazy_static! {
    static ref DIGITS: Regex = Regex::new(r"\d+").unwrap();
}

impl AgencyConfig {
    /// Derives the canonical stop ID. The feed's stop code is preferred, but
    /// this agency leaves it blank or "0" on some stops, falling back to the
    /// stop ID. After prefix stripping, a purely numeric remainder is the ID
    /// itself; everything else must be in the override table.
    pub fn stop_id(&self, stop: &gtfs::Stop) -> Result<StopId, NormalizeError> {
        let raw = match &stop.code {
            Some(code) if !code.is_empty() && code != "0" => code.as_str(),
            _ => stop.stop_id.as_str(),
        };
        let stripped = self.strip_prefix(raw);
        if let Some(id) = self.stop_override(&stripped) {
            return Ok(id);
        }
        if !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(x) = stripped.parse::<u32>() {
                return Ok(StopId(x));
            }
        }
        Err(NormalizeError::UnrecognizedIdentifier {
            code: raw.to_string(),
        })
    }

    /// First run of digits after prefix stripping, if any. Route IDs embed the
    /// number mid-string, so this is looser than stop ID parsing.
    pub(crate) fn numeric_route_id(&self, raw: &str) -> Option<u32> {
        let stripped = self.strip_prefix(raw);
        DIGITS.find(&stripped)?.as_str().parse().ok()
    }
}
