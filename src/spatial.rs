//! Stop-to-hot-tile spatial join.
//!
//! Hot tiles are indexed by their `(row, col)` grid key. A stop's key is found
//! by truncating its coordinates against the grid origin, so each lookup is a
//! single hash probe instead of a scan over every tile. Footprints are
//! half-open (`[min, max)` on both axes): a stop on an edge shared by two
//! tiles belongs to the one whose minimum edge it sits on.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::climate::{HotZoneSet, Tile, TileId};
use crate::error::{Result, check_coord};
use crate::transit::Stop;

/// A stop lying inside a hot tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopHotZoneMembership {
    pub stop_id: String,
    pub tile_id: TileId,
    pub temperature: f64,
}

/// Flat export view of a membership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembershipRow {
    pub stop_id: String,
    pub tile_id: String,
    pub temperature: f64,
}

impl From<&StopHotZoneMembership> for MembershipRow {
    fn from(m: &StopHotZoneMembership) -> Self {
        MembershipRow {
            stop_id: m.stop_id.clone(),
            tile_id: m.tile_id.to_string(),
            temperature: m.temperature,
        }
    }
}

/// Hash index of hot tiles keyed by grid cell.
pub struct TileIndex<'a> {
    zones: &'a HotZoneSet,
    cells: HashMap<TileId, &'a Tile>,
}

impl<'a> TileIndex<'a> {
    pub fn new(zones: &'a HotZoneSet) -> Self {
        let cells = zones.tiles.iter().map(|t| (t.id, t)).collect();
        Self { zones, cells }
    }

    /// The hot tile containing the point, if any.
    pub fn lookup(&self, lon: f64, lat: f64) -> Option<&'a Tile> {
        self.cells.get(&self.zones.grid.cell_of(lon, lat)).copied()
    }
}

/// Returns one membership per stop inside a hot tile, in stop order.
///
/// Stops outside every hot tile are left out.
///
/// # Errors
///
/// Returns [`crate::HeatError::InvalidParameter`] for a stop with non-finite
/// or out-of-range coordinates.
#[tracing::instrument(skip_all, fields(stops = stops.len(), hot_tiles = hot_zones.len()))]
pub fn join(stops: &[Stop], hot_zones: &HotZoneSet) -> Result<Vec<StopHotZoneMembership>> {
    let index = TileIndex::new(hot_zones);
    let mut memberships = Vec::new();

    for stop in stops {
        check_coord(&format!("stop '{}'", stop.stop_id), stop.lon, stop.lat)?;
        if let Some(tile) = index.lookup(stop.lon, stop.lat) {
            memberships.push(StopHotZoneMembership {
                stop_id: stop.stop_id.clone(),
                tile_id: tile.id,
                temperature: tile.temperature,
            });
        }
    }

    debug!(matched = memberships.len(), "Stops joined to hot zones");
    Ok(memberships)
}
