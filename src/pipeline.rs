//! End-to-end analysis run: tiles, hot zones, join, aggregation, scoring.

use serde::Serialize;
use tracing::info;

use crate::analyzers::aggregate::{aggregate_lines, stop_exposures};
use crate::analyzers::score::{score, summarize};
use crate::analyzers::types::{LineAggregate, PriorityResult, ScoringMode, ScoringSummary};
use crate::climate::tile_grid::TemperatureStats;
use crate::climate::{ClimateSample, HotZoneSet, TileGrid, select, temperature_stats};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::spatial::{MembershipRow, StopHotZoneMembership, join};
use crate::transit::{Line, Stop, lines_by_id, stops_by_id};

/// Fully materialized input records of one run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInputs {
    pub samples: Vec<ClimateSample>,
    pub stops: Vec<Stop>,
    pub lines: Vec<Line>,
}

/// Everything a run derives.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub hot_zones: HotZoneSet,
    pub tile_stats: TemperatureStats,
    pub memberships: Vec<StopHotZoneMembership>,
    pub line_aggregates: Vec<LineAggregate>,
    pub priorities: Vec<PriorityResult>,
    pub summary: RunSummary,
}

/// Serializable overview of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub year: i32,
    pub variable: String,
    pub percentile: f64,
    pub threshold: f64,
    pub tiles: usize,
    pub hot_tiles: usize,
    pub stops: usize,
    pub stops_in_hot_zones: usize,
    pub tile_temperatures: TemperatureStats,
    pub scoring: ScoringSummary,
}

impl AnalysisOutput {
    pub fn membership_rows(&self) -> Vec<MembershipRow> {
        self.memberships.iter().map(MembershipRow::from).collect()
    }
}

/// Runs every stage for one (year, variable, percentile) analysis.
///
/// Stages run in order and the first error aborts the run; nothing partial
/// is returned.
#[tracing::instrument(
    skip_all,
    fields(
        year = config.year,
        variable = %config.variable,
        percentile = config.percentile,
        mode = %config.mode
    )
)]
pub fn run(config: &AnalysisConfig, inputs: &AnalysisInputs) -> Result<AnalysisOutput> {
    let grid = TileGrid::build(inputs.samples.clone(), config.tile_side)?;
    let tiles = grid.tiles_for(config.year, config.variable)?;
    let tile_stats = temperature_stats(&tiles)?;

    let hot_zones = select(&tiles, config.percentile)?;
    let memberships = join(&inputs.stops, &hot_zones)?;

    let stops_idx = stops_by_id(&inputs.stops)?;
    let lines_idx = lines_by_id(&inputs.lines)?;
    let line_aggregates = aggregate_lines(&memberships, &stops_idx, &lines_idx)?;

    let mut priorities = match config.mode {
        ScoringMode::Line => score(&line_aggregates, &config.weights)?,
        ScoringMode::Stop => score(&stop_exposures(&memberships, &stops_idx)?, &config.weights)?,
    };

    let scoring = summarize(
        config.mode,
        &priorities,
        (config.mode == ScoringMode::Line).then_some(line_aggregates.as_slice()),
    );

    if let Some(n) = config.top_n {
        priorities.truncate(n);
    }

    info!(
        tiles = tiles.len(),
        hot_tiles = hot_zones.len(),
        threshold = hot_zones.threshold,
        stops_in_hot_zones = memberships.len(),
        lines = line_aggregates.len(),
        ranked = priorities.len(),
        "Analysis complete"
    );

    let summary = RunSummary {
        year: config.year,
        variable: config.variable.to_string(),
        percentile: config.percentile,
        threshold: hot_zones.threshold,
        tiles: tiles.len(),
        hot_tiles: hot_zones.len(),
        stops: inputs.stops.len(),
        stops_in_hot_zones: memberships.len(),
        tile_temperatures: tile_stats.clone(),
        scoring,
    };

    Ok(AnalysisOutput {
        hot_zones,
        tile_stats,
        memberships,
        line_aggregates,
        priorities,
        summary,
    })
}
