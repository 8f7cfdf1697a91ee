//! Engine error type.
//!
//! Only conditions that cannot be resolved by retrying within the tick loop
//! reach this type — no-path, station-full, and stuck-AGV conditions are
//! absorbed locally as `Option`/`bool` returns and retried, never escalated.

use crate::grid::Pos;

#[derive(Debug)]
pub enum SimError {
    /// Spawning on a tile already occupied by an AGV is refused.
    SpawnConflict { pos: Pos },
    /// A station id was referenced that isn't in the capacity table.
    UnknownStation { id: String },
    /// The headless pre-placer was asked for more AGVs+carts than there are
    /// parking/pick_station tiles to place them on.
    PlacementInfeasible { requested: usize, available: usize },
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::SpawnConflict { pos } => {
                write!(f, "cannot spawn on occupied tile ({}, {})", pos.x, pos.y)
            }
            SimError::UnknownStation { id } => write!(f, "unknown station id {id:?}"),
            SimError::PlacementInfeasible {
                requested,
                available,
            } => write!(
                f,
                "cannot place {requested} entities — only {available} parking/pick_station tiles available"
            ),
        }
    }
}

impl std::error::Error for SimError {}
