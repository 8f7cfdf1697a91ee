//! Tile grid and directed graph: the static warehouse layout.
//!
//! `build_map` lays out tile kinds on the integer grid; `build_graph` derives
//! the directed adjacency from it, encoding the one-way highway loop plus
//! bidirectional sidetracks into stations, parking, and spawn zones. Both are
//! deterministic and side-effect-free — the result is immutable for the life
//! of a simulation.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::Resource;

/// Integer grid coordinate; the key used throughout the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Pos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl std::ops::Add<(i32, i32)> for Pos {
    type Output = Pos;
    fn add(self, (dx, dy): (i32, i32)) -> Pos {
        Pos::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Empty,
    Highway,
    Parking,
    PickStation,
    BoxDepot,
    Packoff,
    AgvSpawn,
    CartSpawn,
    Racking,
}

impl TileKind {
    pub fn is_highway(self) -> bool {
        matches!(self, TileKind::Highway)
    }

    /// Non-highway kinds that sidetracks and the non-highway 4-neighbour grid connect.
    fn is_sidetrack_endpoint(self) -> bool {
        matches!(
            self,
            TileKind::PickStation | TileKind::Parking | TileKind::AgvSpawn | TileKind::CartSpawn
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    pub station_id: Option<String>,
}

impl Tile {
    fn new(kind: TileKind, station_id: Option<&str>) -> Self {
        Self {
            kind,
            station_id: station_id.map(str::to_owned),
        }
    }
}

pub type TileMap = HashMap<Pos, Tile>;

/// Wraps [`TileMap`] as a world resource (a bare `HashMap` can't derive `Resource`
/// itself — it's a foreign type from the engine's perspective).
#[derive(Debug, Clone, Default, Resource)]
pub struct TileMapResource(pub TileMap);

/// Wraps the station capacity table as a world resource.
#[derive(Debug, Clone, Default, Resource)]
pub struct StationCapacities(pub HashMap<String, u32>);

/// Directed adjacency: `pos -> {neighbours reachable in one step}`.
#[derive(Debug, Clone, Default, Resource)]
pub struct Graph {
    edges: HashMap<Pos, HashSet<Pos>>,
}

impl Graph {
    pub fn contains(&self, pos: Pos) -> bool {
        self.edges.contains_key(&pos)
    }

    pub fn neighbors(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        self.edges.get(&pos).into_iter().flatten().copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = Pos> + '_ {
        self.edges.keys().copied()
    }

    fn entry(&mut self, pos: Pos) -> &mut HashSet<Pos> {
        self.edges.entry(pos).or_default()
    }
}

pub const LEFT_HWY_COL: i32 = 9;
pub const RIGHT_HWY_COL: i32 = 38;
pub const NORTH_HWY_ROW: i32 = 7;
pub const EAST_HWY_ROW: i32 = 38;

/// Default target for `return_to_spawn`, nudges, and idle parking fallbacks:
/// the centre of the dedicated AGV spawn zone (cols 1-8, rows 0-6).
pub const AGV_SPAWN_TILE: Pos = Pos::new(4, 3);

/// The single cart-spawn tile (normative per design notes; older layouts listed two).
pub const CART_SPAWN_TILE: Pos = Pos::new(0, 7);

/// Build the reference warehouse tile map.
pub fn build_map() -> TileMap {
    let mut tiles = TileMap::new();

    let mut put = |tiles: &mut TileMap, x: i32, y: i32, kind: TileKind, sid: Option<&str>| {
        tiles.insert(Pos::new(x, y), Tile::new(kind, sid));
    };
    let fill_rect = |tiles: &mut TileMap,
                      x1: i32,
                      y1: i32,
                      x2: i32,
                      y2: i32,
                      kind: TileKind,
                      sid: Option<&str>| {
        for x in x1..=x2 {
            for y in y1..=y2 {
                tiles.insert(Pos::new(x, y), Tile::new(kind, sid));
            }
        }
    };
    let hline = |tiles: &mut TileMap, x1: i32, x2: i32, y: i32, kind: TileKind| {
        for x in x1..=x2 {
            tiles.insert(Pos::new(x, y), Tile::new(kind, None));
        }
    };
    let vline = |tiles: &mut TileMap, x: i32, y1: i32, y2: i32, kind: TileKind| {
        for y in y1..=y2 {
            tiles.insert(Pos::new(x, y), Tile::new(kind, None));
        }
    };

    // AGV spawn (top-left, cols 1-8, rows 0-6).
    fill_rect(&mut tiles, 1, 0, 8, 6, TileKind::AgvSpawn, None);

    // Cart spawn (left edge, row 7 only).
    put(&mut tiles, 0, 7, TileKind::CartSpawn, None);

    // Box Depot (top-centre).
    fill_rect(&mut tiles, 14, 1, 24, 4, TileKind::BoxDepot, Some("Box_Depot"));
    for i in 0..8 {
        put(&mut tiles, 15 + i, 5, TileKind::Parking, Some("Box_Depot"));
    }
    for i in 0..8 {
        put(&mut tiles, 15 + i, 6, TileKind::Highway, None);
    }

    // Pack-off conveyor (top-right).
    fill_rect(&mut tiles, 47, 1, 54, 3, TileKind::Packoff, Some("Pack_off"));
    for i in 0..4 {
        put(&mut tiles, 49 + i, 4, TileKind::Parking, Some("Pack_off"));
    }
    for i in 0..4 {
        vline(&mut tiles, 49 + i, 5, 6, TileKind::Highway);
    }

    // North highway (row 7, full width) plus the two-lane spawn-exit section.
    hline(&mut tiles, 1, 57, NORTH_HWY_ROW, TileKind::Highway);
    hline(&mut tiles, 1, 8, NORTH_HWY_ROW + 1, TileKind::Highway);
    hline(&mut tiles, 39, 57, NORTH_HWY_ROW + 1, TileKind::Highway);

    // Left section: single highway column.
    vline(&mut tiles, LEFT_HWY_COL, 8, EAST_HWY_ROW, TileKind::Highway);

    // East highway (row 38).
    hline(&mut tiles, LEFT_HWY_COL, RIGHT_HWY_COL, EAST_HWY_ROW, TileKind::Highway);

    // Right section: single highway column.
    vline(&mut tiles, RIGHT_HWY_COL, 8, EAST_HWY_ROW, TileKind::Highway);

    // Left-side stations.
    fill_rect(&mut tiles, 4, 10, 7, 14, TileKind::Racking, Some("S1"));
    for y in 10..=14 {
        put(&mut tiles, 8, y, TileKind::PickStation, Some("S1"));
    }
    fill_rect(&mut tiles, 11, 17, 16, 20, TileKind::Racking, Some("S2"));
    for y in 17..=20 {
        put(&mut tiles, 10, y, TileKind::PickStation, Some("S2"));
    }
    fill_rect(&mut tiles, 4, 23, 7, 26, TileKind::Racking, Some("S3"));
    for y in 23..=26 {
        put(&mut tiles, 8, y, TileKind::PickStation, Some("S3"));
    }
    fill_rect(&mut tiles, 11, 29, 16, 32, TileKind::Racking, Some("S4"));
    for y in 29..=32 {
        put(&mut tiles, 10, y, TileKind::PickStation, Some("S4"));
    }

    // Right-side stations.
    fill_rect(&mut tiles, 40, 34, 44, 36, TileKind::Racking, Some("S5"));
    for y in 34..=36 {
        put(&mut tiles, 39, y, TileKind::PickStation, Some("S5"));
    }
    fill_rect(&mut tiles, 32, 28, 36, 31, TileKind::Racking, Some("S6"));
    for y in 28..=31 {
        put(&mut tiles, 37, y, TileKind::PickStation, Some("S6"));
    }
    fill_rect(&mut tiles, 40, 22, 44, 25, TileKind::Racking, Some("S7"));
    for y in 22..=25 {
        put(&mut tiles, 39, y, TileKind::PickStation, Some("S7"));
    }
    fill_rect(&mut tiles, 32, 16, 36, 19, TileKind::Racking, Some("S8"));
    for y in 16..=19 {
        put(&mut tiles, 37, y, TileKind::PickStation, Some("S8"));
    }
    fill_rect(&mut tiles, 40, 10, 44, 13, TileKind::Racking, Some("S9"));
    for y in 10..=13 {
        put(&mut tiles, 39, y, TileKind::PickStation, Some("S9"));
    }

    // Parking, opposite side of each station.
    for y in 10..=14 {
        put(&mut tiles, 10, y, TileKind::Parking, None);
    }
    for y in 17..=20 {
        put(&mut tiles, 8, y, TileKind::Parking, None);
    }
    for y in 23..=26 {
        put(&mut tiles, 10, y, TileKind::Parking, None);
    }
    for y in 29..=32 {
        put(&mut tiles, 8, y, TileKind::Parking, None);
    }
    for y in 34..=36 {
        put(&mut tiles, 37, y, TileKind::Parking, None);
    }
    for y in 28..=31 {
        put(&mut tiles, 39, y, TileKind::Parking, None);
    }
    for y in 22..=25 {
        put(&mut tiles, 37, y, TileKind::Parking, None);
    }
    for y in 16..=19 {
        put(&mut tiles, 39, y, TileKind::Parking, None);
    }
    for y in 10..=13 {
        put(&mut tiles, 37, y, TileKind::Parking, None);
    }

    // Gap rows: parking on both sides of the highway.
    let left_gap_rows = [9, 15, 16, 21, 22, 27, 28, 33, 34, 35, 36, 37];
    for &y in &left_gap_rows {
        for &x in &[8, 10] {
            tiles
                .entry(Pos::new(x, y))
                .or_insert_with(|| Tile::new(TileKind::Parking, None));
        }
    }

    let right_gap_rows = [9, 14, 15, 20, 21, 26, 27, 32, 33, 37];
    for &y in &right_gap_rows {
        for &x in &[37, 39] {
            tiles
                .entry(Pos::new(x, y))
                .or_insert_with(|| Tile::new(TileKind::Parking, None));
        }
    }

    // Along the north highway (one row above, row 6).
    for &x in &[10, 12, 26, 28, 30, 40, 55] {
        tiles
            .entry(Pos::new(x, 6))
            .or_insert_with(|| Tile::new(TileKind::Parking, None));
    }

    // Along the east highway (one row below, row 39).
    for &x in &[12, 18, 24, 30, 36] {
        put(&mut tiles, x, 39, TileKind::Parking, None);
    }

    tiles
}

/// Junction tiles whose outgoing highway exits are enumerated explicitly rather
/// than derived from the corridor rules below.
fn junction_exits(pos: Pos) -> Option<&'static [(i32, i32)]> {
    match (pos.x, pos.y) {
        (9, 7) => Some(&[(0, 1), (-1, 0)]),
        (9, 8) => Some(&[(0, 1), (-1, 0)]),
        (9, 38) => Some(&[(1, 0)]),
        (38, 38) => Some(&[(0, -1)]),
        (38, 8) => Some(&[(0, -1), (1, 0)]),
        (38, 7) => Some(&[(-1, 0)]),
        (57, 8) => Some(&[(0, -1)]),
        _ => None,
    }
}

/// Allowed `(dx, dy)` moves out of a highway tile at `(x, y)`.
fn highway_directions(x: i32, y: i32) -> Vec<(i32, i32)> {
    if let Some(exits) = junction_exits(Pos::new(x, y)) {
        return exits.to_vec();
    }
    if y == NORTH_HWY_ROW && (1..=8).contains(&x) {
        return vec![(1, 0)];
    }
    if y == NORTH_HWY_ROW + 1 && (1..=8).contains(&x) {
        return vec![(-1, 0)];
    }
    if y == NORTH_HWY_ROW && (10..=57).contains(&x) {
        let mut dirs = vec![(-1, 0)];
        if (15..=22).contains(&x) {
            dirs.push((0, -1));
        }
        if (49..=52).contains(&x) {
            dirs.push((0, -1));
        }
        return dirs;
    }
    if x == LEFT_HWY_COL && (8..=EAST_HWY_ROW).contains(&y) {
        return vec![(0, 1)];
    }
    if y == EAST_HWY_ROW && (LEFT_HWY_COL..=RIGHT_HWY_COL).contains(&x) {
        return vec![(1, 0)];
    }
    if x == RIGHT_HWY_COL && (8..=EAST_HWY_ROW).contains(&y) {
        return vec![(0, -1)];
    }
    if y == NORTH_HWY_ROW + 1 && (39..=57).contains(&x) {
        return vec![(1, 0)];
    }
    if (15..=22).contains(&x) && (5..=6).contains(&y) {
        return vec![(0, -1), (0, 1)];
    }
    if (49..=52).contains(&x) && (5..=6).contains(&y) {
        return vec![(0, -1), (0, 1)];
    }
    Vec::new()
}

/// Derive the directed adjacency graph from a tile map.
pub fn build_graph(tiles: &TileMap) -> Graph {
    let mut graph = Graph::default();

    let mut highway_positions = HashSet::new();
    let mut non_highway_positions = HashSet::new();
    for (&pos, tile) in tiles.iter() {
        if tile.kind == TileKind::Highway {
            highway_positions.insert(pos);
        } else if tile.kind.is_sidetrack_endpoint() {
            non_highway_positions.insert(pos);
        }
    }
    let all_positions: HashSet<Pos> = highway_positions
        .union(&non_highway_positions)
        .copied()
        .collect();

    for &pos in &all_positions {
        graph.entry(pos);
    }

    for &pos in &highway_positions {
        for (dx, dy) in highway_directions(pos.x, pos.y) {
            let neighbor = pos + (dx, dy);
            if all_positions.contains(&neighbor) {
                graph.entry(pos).insert(neighbor);
            }
        }
    }

    const CARDINAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

    for &pos in &non_highway_positions {
        for (dx, dy) in CARDINAL {
            let neighbor = pos + (dx, dy);
            if all_positions.contains(&neighbor) {
                graph.entry(pos).insert(neighbor);
            }
        }
    }

    for &pos in &highway_positions {
        for (dx, dy) in CARDINAL {
            let neighbor = pos + (dx, dy);
            if non_highway_positions.contains(&neighbor) && tiles[&neighbor].kind.is_sidetrack_endpoint()
            {
                graph.entry(pos).insert(neighbor);
                graph.entry(neighbor).insert(pos);
            }
        }
    }

    graph
}

/// Reference station capacities: pick stations S1-S9, Box_Depot, Pack_off.
pub fn default_station_capacities() -> HashMap<String, u32> {
    let mut caps = HashMap::new();
    caps.insert("S1".to_string(), 5);
    caps.insert("S2".to_string(), 4);
    caps.insert("S3".to_string(), 4);
    caps.insert("S4".to_string(), 4);
    caps.insert("S5".to_string(), 3);
    caps.insert("S6".to_string(), 4);
    caps.insert("S7".to_string(), 4);
    caps.insert("S8".to_string(), 4);
    caps.insert("S9".to_string(), 4);
    caps.insert("Box_Depot".to_string(), 8);
    caps.insert("Pack_off".to_string(), 4);
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_corridor_is_two_lane_one_way() {
        for x in 1..=8 {
            assert_eq!(highway_directions(x, NORTH_HWY_ROW), vec![(1, 0)]);
            assert_eq!(highway_directions(x, NORTH_HWY_ROW + 1), vec![(-1, 0)]);
        }
    }

    #[test]
    fn junctions_expose_exact_enumerated_exits() {
        let expected: &[(Pos, &[(i32, i32)])] = &[
            (Pos::new(9, 7), &[(0, 1), (-1, 0)]),
            (Pos::new(9, 8), &[(0, 1), (-1, 0)]),
            (Pos::new(9, 38), &[(1, 0)]),
            (Pos::new(38, 8), &[(0, -1), (1, 0)]),
            (Pos::new(38, 7), &[(-1, 0)]),
            (Pos::new(38, 38), &[(0, -1)]),
            (Pos::new(57, 8), &[(0, -1)]),
        ];
        for &(pos, exits) in expected {
            assert_eq!(highway_directions(pos.x, pos.y), exits.to_vec());
        }
    }

    #[test]
    fn sidetracks_are_bidirectional() {
        let tiles = build_map();
        let graph = build_graph(&tiles);
        // (1,7) is highway; (0,7) is the cart-spawn sidetrack.
        assert!(graph.neighbors(Pos::new(1, 7)).any(|p| p == CART_SPAWN_TILE));
        assert!(graph.neighbors(CART_SPAWN_TILE).any(|p| p == Pos::new(1, 7)));
    }

    #[test]
    fn station_capacities_match_reference() {
        let caps = default_station_capacities();
        assert_eq!(caps["S1"], 5);
        assert_eq!(caps["S5"], 3);
        assert_eq!(caps["Box_Depot"], 8);
        assert_eq!(caps["Pack_off"], 4);
    }
}
