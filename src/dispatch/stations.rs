//! Station fill accounting and capacity-aware station selection.

use std::collections::HashMap;

use crate::grid::{Pos, StationCapacities, TileKind, TileMap};

/// `(current, capacity, fill_rate)` for one station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationFill {
    pub current: u32,
    pub capacity: u32,
    pub fill_rate: f32,
}

/// Positions grouped by `(station_id, tile_kind)`, built once from the immutable tile map.
pub type StationTileIndex = HashMap<(String, TileKind), Vec<Pos>>;

pub fn build_station_tile_index(tiles: &TileMap) -> StationTileIndex {
    let mut index = StationTileIndex::new();
    for (&pos, tile) in tiles.iter() {
        if let Some(sid) = &tile.station_id {
            index
                .entry((sid.clone(), tile.kind))
                .or_default()
                .push(pos);
        }
    }
    index
}

fn station_key(station_id: &str) -> TileKind {
    if station_id.starts_with('S') {
        TileKind::PickStation
    } else {
        TileKind::Parking
    }
}

pub fn station_fill(
    index: &StationTileIndex,
    capacities: &StationCapacities,
    reserved: &std::collections::HashSet<Pos>,
) -> HashMap<String, StationFill> {
    let mut fill = HashMap::new();
    for (station_id, &capacity) in capacities.0.iter() {
        let key = (station_id.clone(), station_key(station_id));
        let positions = index.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let current = positions.iter().filter(|p| reserved.contains(p)).count() as u32;
        let fill_rate = if capacity > 0 {
            current as f32 / capacity as f32
        } else {
            0.0
        };
        fill.insert(
            station_id.clone(),
            StationFill {
                current,
                capacity,
                fill_rate,
            },
        );
    }
    fill
}

/// Rank `remaining_stations` by `(tier, manhattan distance)` and return the
/// best, excluding saturated stations. `None` if every candidate is full.
pub fn pick_best_station(
    remaining_stations: &[u32],
    cart_pos: Pos,
    index: &StationTileIndex,
    fill: &HashMap<String, StationFill>,
) -> Option<u32> {
    let mut candidates: Vec<(u8, i32, u32)> = Vec::new();
    for &s in remaining_stations {
        let sid = format!("S{s}");
        let StationFill {
            current, capacity, ..
        } = fill.get(&sid).copied().unwrap_or(StationFill {
            current: 0,
            capacity: 0,
            fill_rate: 1.0,
        });
        if current >= capacity {
            continue;
        }
        let rate = if capacity > 0 {
            current as f32 / capacity as f32
        } else {
            1.0
        };
        let tier: u8 = if rate <= 0.50 {
            1
        } else if rate <= 0.75 {
            2
        } else {
            3
        };
        let station_tiles = index
            .get(&(sid.clone(), TileKind::PickStation))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let dist = station_tiles
            .first()
            .map(|&t| cart_pos.manhattan(t))
            .unwrap_or(i32::MAX);
        candidates.push((tier, dist, s));
    }
    candidates.sort();
    candidates.first().map(|&(_, _, s)| s)
}

/// An unoccupied tile for `station_id` of `kind`, or `None` if full.
pub fn find_tile(
    index: &StationTileIndex,
    station_id: &str,
    kind: TileKind,
    reserved: &std::collections::HashSet<Pos>,
) -> Option<Pos> {
    let positions = index.get(&(station_id.to_string(), kind))?;
    positions.iter().copied().find(|p| !reserved.contains(p))
}

/// Nearest unoccupied, unaffiliated (no `station_id`) parking tile to `near_pos`.
pub fn find_buffer_spot(
    tiles: &TileMap,
    near_pos: Pos,
    reserved: &std::collections::HashSet<Pos>,
) -> Option<Pos> {
    tiles
        .iter()
        .filter(|(_, tile)| tile.kind == TileKind::Parking && tile.station_id.is_none())
        .map(|(&pos, _)| pos)
        .filter(|pos| !reserved.contains(pos))
        .min_by_key(|pos| pos.manhattan(near_pos))
}
