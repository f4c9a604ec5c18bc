//! Data types used by the aggregation and scoring stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::climate::TileId;
use crate::error::HeatError;
use crate::transit::AcStatus;

/// Which entity the scorer ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    Line,
    Stop,
}

impl ScoringMode {
    /// Canonical factor set of the mode, in column order.
    pub fn factors(&self) -> &'static [Factor] {
        match self {
            ScoringMode::Line => &[
                Factor::Temperature,
                Factor::HotStops,
                Factor::AirConditioning,
                Factor::Passengers,
            ],
            ScoringMode::Stop => &[
                Factor::Temperature,
                Factor::Passengers,
                Factor::LackOfShelter,
                Factor::LackOfBench,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Line => "line",
            ScoringMode::Stop => "stop",
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMode {
    type Err = HeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" | "lines" => Ok(ScoringMode::Line),
            "stop" | "stops" => Ok(ScoringMode::Stop),
            other => Err(HeatError::InvalidConfig(format!(
                "unknown scoring mode '{other}' (expected line or stop)"
            ))),
        }
    }
}

/// A named scoring factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Temperature,
    HotStops,
    AirConditioning,
    Passengers,
    LackOfShelter,
    LackOfBench,
}

impl Factor {
    pub fn name(&self) -> &'static str {
        match self {
            Factor::Temperature => "temperature",
            Factor::HotStops => "hot_stops",
            Factor::AirConditioning => "air_conditioning",
            Factor::Passengers => "passengers",
            Factor::LackOfShelter => "lack_of_shelter",
            Factor::LackOfBench => "lack_of_bench",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-line statistics over the line's stops that sit in hot zones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineAggregate {
    pub line_id: String,
    pub name: String,
    pub mode: String,
    pub total_stops: u32,
    pub daily_frequency: u32,
    pub air_conditioning: AcStatus,
    pub hot_stop_count: usize,
    pub mean_temperature: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub total_passengers: u64,
    pub avg_passengers: f64,
    pub stops_without_shelter: usize,
    pub stops_without_bench: usize,
}

/// A hot-zone stop joined with its stop record, scored in stop mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopExposure {
    pub stop_id: String,
    pub name: String,
    pub tile_id: TileId,
    pub temperature: f64,
    pub daily_passengers: u64,
    pub has_shelter: bool,
    pub has_bench: bool,
}

/// Urgency band of a priority score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityCategory {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PriorityCategory::Low => "Low",
            PriorityCategory::Medium => "Medium",
            PriorityCategory::High => "High",
            PriorityCategory::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// One factor's share of a priority score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorMetric {
    pub factor: Factor,
    pub raw: f64,
    pub normalized: f64,
    pub weight: f64,
}

/// Ranked score of a stop or line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityResult {
    pub entity_id: String,
    pub mode: ScoringMode,
    pub score: f64,
    pub rank: usize,
    pub category: PriorityCategory,
    pub metrics: Vec<FactorMetric>,
}

impl PriorityResult {
    pub fn metric(&self, factor: Factor) -> Option<&FactorMetric> {
        self.metrics.iter().find(|m| m.factor == factor)
    }
}

/// Count of scored lines per air-conditioning status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AcBreakdown {
    pub none: usize,
    pub partial: usize,
    pub full: usize,
    pub unknown: usize,
}

/// Distribution of the scores of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringSummary {
    pub mode: ScoringMode,
    pub entities: usize,
    pub mean_score: f64,
    pub median_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_conditioning: Option<AcBreakdown>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_factor_sets() {
        assert_eq!(ScoringMode::Line.factors().len(), 4);
        assert!(ScoringMode::Line.factors().contains(&Factor::AirConditioning));
        assert!(!ScoringMode::Stop.factors().contains(&Factor::AirConditioning));
        assert!(ScoringMode::Stop.factors().contains(&Factor::LackOfBench));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Lines".parse::<ScoringMode>(), Ok(ScoringMode::Line));
        assert!(matches!(
            "route".parse::<ScoringMode>(),
            Err(HeatError::InvalidConfig(_))
        ));
    }
}
