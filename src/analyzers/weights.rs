//! Named scoring weights.
//!
//! Weights are a plain `{ factor name: number }` map so either canonical
//! factor set can be configured from the same JSON shape:
//! ```json
//! { "temperature": 0.30, "hot_stops": 0.20, "air_conditioning": 0.25, "passengers": 0.25 }
//! ```
//! Values only need to be non-negative; they are rescaled to sum to 1.0
//! before use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analyzers::types::{Factor, ScoringMode};
use crate::error::{HeatError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<String, f64>);

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, factor: &str, weight: f64) -> Self {
        self.0.insert(factor.to_string(), weight);
        self
    }

    /// Default weights of a scoring mode.
    pub fn default_for(mode: ScoringMode) -> Self {
        match mode {
            ScoringMode::Line => Weights::new()
                .with("temperature", 0.30)
                .with("hot_stops", 0.20)
                .with("air_conditioning", 0.25)
                .with("passengers", 0.25),
            ScoringMode::Stop => Weights::new()
                .with("temperature", 0.35)
                .with("passengers", 0.30)
                .with("lack_of_shelter", 0.20)
                .with("lack_of_bench", 0.15),
        }
    }

    pub fn get(&self, factor: &str) -> Option<f64> {
        self.0.get(factor).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Validates the map against `mode` and rescales it to sum to 1.0.
    ///
    /// Returns one `(factor, weight)` per canonical factor of the mode, in
    /// column order; factors absent from the map weigh 0.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::InvalidConfig`] for a negative or non-finite
    /// weight, a name outside the mode's factor set, or an all-zero map.
    pub fn normalized_for(&self, mode: ScoringMode) -> Result<Vec<(Factor, f64)>> {
        let factors = mode.factors();

        for (name, weight) in self.iter() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(HeatError::InvalidConfig(format!(
                    "weight '{name}' must be a non-negative number, got {weight}"
                )));
            }
            if !factors.iter().any(|f| f.name() == name) {
                let allowed: Vec<&str> = factors.iter().map(|f| f.name()).collect();
                return Err(HeatError::InvalidConfig(format!(
                    "'{name}' is not a {mode} factor (expected one of {})",
                    allowed.join(", ")
                )));
            }
        }

        let total: f64 = self.0.values().sum();
        if total <= 0.0 {
            return Err(HeatError::InvalidConfig(
                "at least one weight must be positive".into(),
            ));
        }

        Ok(factors
            .iter()
            .map(|f| (*f, self.get(f.name()).unwrap_or(0.0) / total))
            .collect())
    }
}

impl FromIterator<(String, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Weights(iter.into_iter().collect())
    }
}
