//! Percentile selection of the hottest climate tiles.

use serde::Serialize;
use tracing::info;

use super::{GridGeometry, Tile};
use crate::analyzers::utility::quantile;
use crate::error::{HeatError, Result};

/// Tiles at or above the temperature quantile of their full population.
#[derive(Debug, Clone, PartialEq)]
pub struct HotZoneSet {
    pub grid: GridGeometry,
    pub percentile: f64,
    pub threshold: f64,
    pub population: usize,
    pub tiles: Vec<Tile>,
}

impl HotZoneSet {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Hot tiles as flat export rows.
    pub fn rows(&self) -> Vec<HotTileRow> {
        self.tiles.iter().map(HotTileRow::from).collect()
    }
}

/// Flat, serializable view of a hot tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotTileRow {
    pub tile_id: String,
    pub row: i64,
    pub col: i64,
    pub center_lon: f64,
    pub center_lat: f64,
    pub side: f64,
    pub temperature: f64,
    pub year: i32,
    pub variable: String,
}

impl From<&Tile> for HotTileRow {
    fn from(tile: &Tile) -> Self {
        HotTileRow {
            tile_id: tile.id.to_string(),
            row: tile.id.row,
            col: tile.id.col,
            center_lon: tile.center_lon,
            center_lat: tile.center_lat,
            side: tile.side(),
            temperature: tile.temperature,
            year: tile.year,
            variable: tile.variable.to_string(),
        }
    }
}

/// Keeps every tile whose temperature is `>=` the `percentile`-quantile of
/// the input temperatures.
///
/// The comparison is inclusive, so ties at the cutoff are all kept and the
/// result may exceed `1 - percentile` of the population. Input order is
/// preserved.
///
/// # Errors
///
/// Returns [`HeatError::InvalidParameter`] when `percentile` is outside
/// `(0, 1)` or `tiles` is empty, and [`HeatError::Data`] when the tiles do not
/// share one grid.
#[tracing::instrument(skip(tiles), fields(tiles = tiles.len()))]
pub fn select(tiles: &[Tile], percentile: f64) -> Result<HotZoneSet> {
    if !(percentile > 0.0 && percentile < 1.0) {
        return Err(HeatError::InvalidParameter(format!(
            "percentile must be in (0, 1), got {percentile}"
        )));
    }
    let Some(first) = tiles.first() else {
        return Err(HeatError::InvalidParameter(
            "cannot select hot zones from an empty tile set".into(),
        ));
    };
    let grid = first.grid;
    if tiles.iter().any(|t| t.grid != grid) {
        return Err(HeatError::Data("tiles come from different grids".into()));
    }

    let mut temps: Vec<f64> = tiles.iter().map(|t| t.temperature).collect();
    temps.sort_by(f64::total_cmp);
    let threshold = quantile(&temps, percentile)
        .ok_or_else(|| HeatError::Data("no tile temperatures".into()))?;

    let hot: Vec<Tile> = tiles
        .iter()
        .filter(|t| t.temperature >= threshold)
        .cloned()
        .collect();

    info!(
        threshold,
        percentile,
        hot = hot.len(),
        population = tiles.len(),
        "Hot zones selected"
    );

    Ok(HotZoneSet {
        grid,
        percentile,
        threshold,
        population: tiles.len(),
        tiles: hot,
    })
}
