//! Run configuration threaded through every pipeline stage.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::analyzers::types::ScoringMode;
use crate::analyzers::weights::Weights;
use crate::climate::{ClimateVariable, DEFAULT_TILE_SIDE};

/// Everything one analysis run depends on besides its input records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub year: i32,
    pub variable: ClimateVariable,
    /// Quantile in (0, 1); 0.99 keeps the hottest 1% of tiles.
    pub percentile: f64,
    pub mode: ScoringMode,
    pub weights: Weights,
    /// Tile side in degrees.
    pub tile_side: f64,
    /// Keep only the first `n` ranked results.
    pub top_n: Option<usize>,
}

impl AnalysisConfig {
    /// A config with the mode's default weights and the default tile side.
    pub fn new(year: i32, variable: ClimateVariable, percentile: f64, mode: ScoringMode) -> Self {
        Self {
            year,
            variable,
            percentile,
            mode,
            weights: Weights::default_for(mode),
            tile_side: DEFAULT_TILE_SIDE,
            top_n: None,
        }
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_tile_side(mut self, side: f64) -> Self {
        self.tile_side = side;
        self
    }

    pub fn with_top_n(mut self, top_n: Option<usize>) -> Self {
        self.top_n = top_n;
        self
    }
}

/// Loads a weights map from a JSON object file such as
/// `{ "temperature": 0.4, "hot_stops": 0.3, "air_conditioning": 0.3 }`.
pub fn load_weights(path: impl AsRef<Path>) -> Result<Weights> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read weights file '{}'", path.display()))?;
    let weights: Weights = serde_json::from_str(&content)
        .with_context(|| {
            format!(
                "weights file '{}' is not a JSON object of numbers",
                path.display()
            )
        })?;
    Ok(weights)
}
