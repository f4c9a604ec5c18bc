//! Error taxonomy for the scoring engine.
//!
//! Every stage returns [`HeatError`] synchronously; nothing is retried and a
//! failed stage never yields partial output.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeatError {
    /// Missing, empty or inconsistent input for the requested parameters.
    #[error("data error: {0}")]
    Data(String),

    /// Percentile, tile side or coordinate outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed weight configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, HeatError>;

/// Checks that a WGS84 coordinate pair is finite and in range.
pub fn check_coord(what: &str, lon: f64, lat: f64) -> Result<()> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(HeatError::InvalidParameter(format!(
            "{what}: non-finite coordinate ({lon}, {lat})"
        )));
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(HeatError::InvalidParameter(format!(
            "{what}: coordinate ({lon}, {lat}) out of WGS84 range"
        )));
    }
    Ok(())
}
