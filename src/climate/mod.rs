//! Gridded climate projections.
//!
//! [`TileGrid`] turns raw samples into square tiles, and [`hot_zones::select`]
//! keeps the tiles at or above a temperature percentile.

pub mod hot_zones;
pub mod tile_grid;

pub use hot_zones::{HotZoneSet, select};
pub use tile_grid::{GridGeometry, Tile, TileGrid, TileId, temperature_stats};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HeatError;

/// Default tile side in degrees, about 2.5 km at the latitude of Paris.
pub const DEFAULT_TILE_SIDE: f64 = 0.0225;

/// Near-surface air temperature variables of the projection datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClimateVariable {
    /// Daily mean.
    Tas,
    /// Daily minimum.
    Tasmin,
    /// Daily maximum.
    Tasmax,
}

impl ClimateVariable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateVariable::Tas => "tas",
            ClimateVariable::Tasmin => "tasmin",
            ClimateVariable::Tasmax => "tasmax",
        }
    }
}

impl fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClimateVariable {
    type Err = HeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tas" => Ok(ClimateVariable::Tas),
            "tasmin" => Ok(ClimateVariable::Tasmin),
            "tasmax" => Ok(ClimateVariable::Tasmax),
            other => Err(HeatError::InvalidParameter(format!(
                "unknown climate variable '{other}' (expected tas, tasmin or tasmax)"
            ))),
        }
    }
}

/// One gridded temperature value, in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSample {
    pub lon: f64,
    pub lat: f64,
    pub temperature: f64,
    pub variable: ClimateVariable,
    pub year: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_round_trip_names() {
        assert_eq!("TASMAX".parse::<ClimateVariable>(), Ok(ClimateVariable::Tasmax));
        assert_eq!(ClimateVariable::Tasmin.to_string(), "tasmin");
    }

    #[test]
    fn test_unknown_variable_is_invalid_parameter() {
        assert!(matches!(
            "tasAdjust".parse::<ClimateVariable>(),
            Err(HeatError::InvalidParameter(_))
        ));
    }
}
