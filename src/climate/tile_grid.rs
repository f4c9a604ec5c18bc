//! Square climate tiles built from gridded samples.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use super::{ClimateSample, ClimateVariable};
use crate::analyzers::utility::{mean, sample_stddev};
use crate::error::{HeatError, Result, check_coord};

/// Grid indices of a tile: `row` grows northwards, `col` eastwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileId {
    pub row: i64,
    pub col: i64,
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}C{}", self.row, self.col)
    }
}

/// Placement of an axis-aligned square grid in lon/lat degrees.
///
/// Cell `(row, col)` covers `[origin + col * side, origin + (col + 1) * side)`
/// on the longitude axis and likewise on latitude. Both bounds are half-open,
/// so every point maps to exactly one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridGeometry {
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub side: f64,
}

impl GridGeometry {
    pub fn new(origin_lon: f64, origin_lat: f64, side: f64) -> Result<Self> {
        if !side.is_finite() || side <= 0.0 {
            return Err(HeatError::InvalidParameter(format!(
                "tile side must be a positive number, got {side}"
            )));
        }
        Ok(Self {
            origin_lon,
            origin_lat,
            side,
        })
    }

    /// Cell holding the point, by truncation against the origin.
    pub fn cell_of(&self, lon: f64, lat: f64) -> TileId {
        TileId {
            row: ((lat - self.origin_lat) / self.side).floor() as i64,
            col: ((lon - self.origin_lon) / self.side).floor() as i64,
        }
    }

    /// `(lon, lat)` of the cell center.
    pub fn center_of(&self, id: TileId) -> (f64, f64) {
        (
            self.origin_lon + (id.col as f64 + 0.5) * self.side,
            self.origin_lat + (id.row as f64 + 0.5) * self.side,
        )
    }

    /// `(min_lon, min_lat, max_lon, max_lat)` of the cell footprint.
    pub fn bounds_of(&self, id: TileId) -> (f64, f64, f64, f64) {
        let min_lon = self.origin_lon + id.col as f64 * self.side;
        let min_lat = self.origin_lat + id.row as f64 * self.side;
        (min_lon, min_lat, min_lon + self.side, min_lat + self.side)
    }
}

/// A square cell of the climate grid with its temperature in °C.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    pub id: TileId,
    pub grid: GridGeometry,
    pub center_lon: f64,
    pub center_lat: f64,
    pub temperature: f64,
    pub year: i32,
    pub variable: ClimateVariable,
}

impl Tile {
    pub fn side(&self) -> f64 {
        self.grid.side
    }

    /// Half-open containment test, consistent with [`GridGeometry::cell_of`].
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.grid.cell_of(lon, lat) == self.id
    }
}

/// Climate samples of one dataset load, tiled on demand per (year, variable).
///
/// Tiling policy: the grid origin sits half a side below the smallest sample
/// longitude and latitude of the requested pair, so a source already gridded
/// at `side` maps one sample per tile. Samples sharing a cell are averaged.
#[derive(Debug, Clone)]
pub struct TileGrid {
    samples: Vec<ClimateSample>,
    side: f64,
}

impl TileGrid {
    /// Validates the samples and the tile side.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::InvalidParameter`] for a non-positive side, a
    /// sample with out-of-range coordinates, or a non-finite temperature.
    pub fn build(samples: Vec<ClimateSample>, side: f64) -> Result<Self> {
        GridGeometry::new(0.0, 0.0, side)?;
        for (i, s) in samples.iter().enumerate() {
            check_coord(&format!("climate sample #{i}"), s.lon, s.lat)?;
            if !s.temperature.is_finite() {
                return Err(HeatError::InvalidParameter(format!(
                    "climate sample #{i}: non-finite temperature"
                )));
            }
        }
        Ok(Self { samples, side })
    }

    pub fn side(&self) -> f64 {
        self.side
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Distinct (year, variable) pairs present in the samples.
    pub fn available(&self) -> BTreeSet<(i32, ClimateVariable)> {
        self.samples.iter().map(|s| (s.year, s.variable)).collect()
    }

    /// Distinct projection years present in the samples.
    pub fn years(&self) -> BTreeSet<i32> {
        self.available().into_iter().map(|(year, _)| year).collect()
    }

    /// Distinct climate variables present in the samples.
    pub fn variables(&self) -> BTreeSet<ClimateVariable> {
        self.available().into_iter().map(|(_, v)| v).collect()
    }

    /// Grid placement for the requested pair.
    pub fn geometry_for(&self, year: i32, variable: ClimateVariable) -> Result<GridGeometry> {
        let mut min_lon = f64::INFINITY;
        let mut min_lat = f64::INFINITY;
        for s in self.matching(year, variable) {
            min_lon = min_lon.min(s.lon);
            min_lat = min_lat.min(s.lat);
        }
        if !min_lon.is_finite() {
            return Err(no_samples(year, variable));
        }
        let half = self.side / 2.0;
        GridGeometry::new(min_lon - half, min_lat - half, self.side)
    }

    /// Tiles for one (year, variable), ordered by `(row, col)`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Data`] when no sample matches the pair.
    #[tracing::instrument(skip(self), fields(samples = self.samples.len()))]
    pub fn tiles_for(&self, year: i32, variable: ClimateVariable) -> Result<Vec<Tile>> {
        let grid = self.geometry_for(year, variable)?;

        let mut cells: BTreeMap<TileId, (f64, usize)> = BTreeMap::new();
        for s in self.matching(year, variable) {
            let entry = cells.entry(grid.cell_of(s.lon, s.lat)).or_insert((0.0, 0));
            entry.0 += s.temperature;
            entry.1 += 1;
        }

        let tiles: Vec<Tile> = cells
            .into_iter()
            .map(|(id, (sum, count))| {
                let (center_lon, center_lat) = grid.center_of(id);
                Tile {
                    id,
                    grid,
                    center_lon,
                    center_lat,
                    temperature: sum / count as f64,
                    year,
                    variable,
                }
            })
            .collect();

        debug!(tiles = tiles.len(), %variable, year, "Climate tiles built");
        Ok(tiles)
    }

    fn matching(
        &self,
        year: i32,
        variable: ClimateVariable,
    ) -> impl Iterator<Item = &ClimateSample> + '_ {
        self.samples
            .iter()
            .filter(move |s| s.year == year && s.variable == variable)
    }
}

fn no_samples(year: i32, variable: ClimateVariable) -> HeatError {
    HeatError::Data(format!("no climate samples for {variable} in {year}"))
}

/// Distribution of tile temperatures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// Min, max, mean and sample standard deviation of tile temperatures.
pub fn temperature_stats(tiles: &[Tile]) -> Result<TemperatureStats> {
    if tiles.is_empty() {
        return Err(HeatError::Data("no tiles to summarize".into()));
    }
    let temps: Vec<f64> = tiles.iter().map(|t| t.temperature).collect();
    let avg = mean(&temps);
    Ok(TemperatureStats {
        count: temps.len(),
        min: temps.iter().copied().fold(f64::INFINITY, f64::min),
        max: temps.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean: avg,
        stddev: sample_stddev(&temps, avg),
    })
}
