//! Job dispatch: station-aware job creation, capacity-balanced assignment,
//! and deadlock/liveness detection.
//!
//! [`Dispatcher`] owns no entities itself; `pending_jobs`/`active_jobs` are
//! lists of `Job` entity ids, and list membership (not a field on `Job`) is
//! what distinguishes a queued job from an assigned one.

mod assignment;
mod jobs;
mod liveness;
mod stations;

pub use stations::StationFill;

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource, World};

use crate::ecs::{Cart, Job};
use crate::grid::{StationCapacities, TileMap};
use stations::StationTileIndex;

/// Central job dispatch and fleet-liveness resource.
#[derive(Resource)]
pub struct Dispatcher {
    pub pending_jobs: Vec<Entity>,
    pub active_jobs: Vec<Entity>,
    pub completed_orders: u64,
    pub cart_start_times: HashMap<Entity, f32>,
    pub cycle_times: Vec<f32>,
    station_tiles: StationTileIndex,
}

impl Dispatcher {
    /// Build a dispatcher over the given (immutable, already-built) tile map.
    pub fn new(tiles: &TileMap) -> Self {
        Self {
            pending_jobs: Vec::new(),
            active_jobs: Vec::new(),
            completed_orders: 0,
            cart_start_times: HashMap::new(),
            cycle_times: Vec::new(),
            station_tiles: stations::build_station_tile_index(tiles),
        }
    }

    /// Current per-station fill, for telemetry and bottleneck reporting.
    pub fn current_station_fill(
        &self,
        world: &World,
        capacities: &StationCapacities,
    ) -> HashMap<String, StationFill> {
        let mut reserved = std::collections::HashSet::new();
        for cart in world.query::<&Cart>().iter(world) {
            if cart.carried_by.is_none() {
                reserved.insert(cart.pos);
            }
        }
        for &job_entity in self.pending_jobs.iter().chain(self.active_jobs.iter()) {
            if let Some(job) = world.get::<Job>(job_entity) {
                reserved.insert(job.target_pos);
            }
        }
        stations::station_fill(&self.station_tiles, capacities, &reserved)
    }

    pub fn average_cycle_time(&self) -> Option<f32> {
        if self.cycle_times.is_empty() {
            None
        } else {
            Some(self.cycle_times.iter().sum::<f32>() / self.cycle_times.len() as f32)
        }
    }

    /// One dispatch tick, run after AGV movement and cart processing have
    /// advanced: create jobs for carts that need one, assign pending jobs to
    /// free AGVs, finish jobs whose AGV has arrived, then handle liveness.
    pub fn update(&mut self, world: &mut World, dt: f32) {
        liveness::cancel_stuck_jobs(self, world, dt);
        jobs::create_jobs(self, world);
        assignment::assign_jobs(self, world);
        assignment::progress_jobs(self, world, dt);
        liveness::handle_blocked_agvs(self, world, dt);
        liveness::park_idle_agvs(self, world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_map;

    #[test]
    fn new_dispatcher_starts_empty() {
        let tiles = build_map();
        let dispatcher = Dispatcher::new(&tiles);
        assert!(dispatcher.pending_jobs.is_empty());
        assert!(dispatcher.active_jobs.is_empty());
        assert_eq!(dispatcher.completed_orders, 0);
        assert_eq!(dispatcher.average_cycle_time(), None);
    }
}
