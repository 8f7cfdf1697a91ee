//! Tunable simulation parameters.
//!
//! Every named constant from the timing-constants and capacity tables lives
//! here, with a `Default` reproducing the reference values, rather than
//! scattered as magic numbers at each call site.

use bevy_ecs::prelude::Resource;

/// AGV speed in tiles per second. Also usable as `1 / tile_travel_time`.
pub const DEFAULT_AGV_SPEED: f32 = 1.0;

/// All per-tick timing and liveness constants (seconds unless noted).
#[derive(Debug, Clone, Copy, PartialEq, Resource)]
pub struct ScenarioParams {
    pub agv_speed: f32,
    pub pickup_time: f32,
    pub dropoff_time: f32,
    pub box_depot_time: f32,
    pub pick_time_per_item: f32,
    pub packoff_time: f32,
    pub block_timeout: f32,
    pub reroute_cooldown: f32,
    pub job_cancel_timeout: f32,
    pub max_concurrent_dispatches: usize,
    /// Sim-seconds between auto-spawned carts when a scenario auto-spawns.
    pub auto_spawn_interval: f32,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            agv_speed: DEFAULT_AGV_SPEED,
            pickup_time: 5.0,
            dropoff_time: 5.0,
            box_depot_time: 45.0,
            pick_time_per_item: 90.0,
            packoff_time: 60.0,
            block_timeout: 3.0,
            reroute_cooldown: 2.0,
            job_cancel_timeout: 30.0,
            max_concurrent_dispatches: 12,
            auto_spawn_interval: 30.0,
        }
    }
}

impl ScenarioParams {
    pub fn with_max_concurrent_dispatches(mut self, max: usize) -> Self {
        self.max_concurrent_dispatches = max;
        self
    }
}

/// Marker for layout construction. The reference layout (`build_map`/`build_graph`)
/// takes no parameters today; this exists so callers have a stable extension
/// point without threading raw geometry arguments through `build_world`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutConfig;

/// Parameters for a headless run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessRunConfig {
    pub num_agvs: usize,
    pub num_carts: usize,
    pub sim_duration: f32,
    pub tick_dt: f32,
    pub verbose: bool,
    pub seed: u64,
}

impl Default for HeadlessRunConfig {
    fn default() -> Self {
        Self {
            num_agvs: 4,
            num_carts: 8,
            sim_duration: 28_800.0,
            tick_dt: 0.1,
            verbose: false,
            seed: 0,
        }
    }
}
