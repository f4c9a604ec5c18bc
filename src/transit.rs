//! Transit network records: stops and the lines serving them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::HeatError;

/// A boarding point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub lines: BTreeSet<String>,
    pub daily_passengers: u64,
    pub has_shelter: bool,
    pub has_bench: bool,
}

/// Air-conditioning equipment of a line's fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcStatus {
    None,
    Partial,
    Full,
    Unknown,
}

impl AcStatus {
    /// Raw urgency of the AC factor: full 0.0, partial 0.5, none 1.0.
    ///
    /// `Unknown` scores as `None`, so unequipped-or-unsurveyed lines surface
    /// for intervention.
    pub fn urgency(&self) -> f64 {
        match self {
            AcStatus::Full => 0.0,
            AcStatus::Partial => 0.5,
            AcStatus::None | AcStatus::Unknown => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AcStatus::None => "none",
            AcStatus::Partial => "partial",
            AcStatus::Full => "full",
            AcStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcStatus {
    type Err = HeatError;

    /// Accepts the open-data spellings too: `true` is full, `false` is none,
    /// and an empty cell is unknown.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "false" | "no" => Ok(AcStatus::None),
            "partial" => Ok(AcStatus::Partial),
            "full" | "true" | "yes" => Ok(AcStatus::Full),
            "unknown" | "" => Ok(AcStatus::Unknown),
            other => Err(HeatError::Data(format!(
                "unrecognized air-conditioning status '{other}'"
            ))),
        }
    }
}

/// A transit line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub line_id: String,
    pub name: String,
    pub mode: String,
    pub total_stops: u32,
    pub daily_frequency: u32,
    pub air_conditioning: AcStatus,
}

/// Indexes stops by id, rejecting duplicates.
pub fn stops_by_id(stops: &[Stop]) -> Result<HashMap<&str, &Stop>, HeatError> {
    let mut map = HashMap::with_capacity(stops.len());
    for stop in stops {
        if map.insert(stop.stop_id.as_str(), stop).is_some() {
            return Err(HeatError::Data(format!(
                "duplicate stop id '{}'",
                stop.stop_id
            )));
        }
    }
    Ok(map)
}

/// Indexes lines by id, rejecting duplicates.
pub fn lines_by_id(lines: &[Line]) -> Result<HashMap<&str, &Line>, HeatError> {
    let mut map = HashMap::with_capacity(lines.len());
    for line in lines {
        if map.insert(line.line_id.as_str(), line).is_some() {
            return Err(HeatError::Data(format!(
                "duplicate line id '{}'",
                line.line_id
            )));
        }
    }
    Ok(map)
}
