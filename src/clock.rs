//! Simulation clock: elapsed sim-time on a fixed timestep.
//!
//! Unlike a discrete-event clock driven by a priority queue of future events,
//! this engine advances every entity by the same `dt` each tick — there are no
//! scheduled events to pop, so the clock is just an accumulator plus a tick
//! counter.

use bevy_ecs::prelude::Resource;

#[derive(Debug, Clone, Copy, Resource)]
pub struct SimClock {
    pub elapsed_secs: f32,
    pub ticks: u64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            elapsed_secs: 0.0,
            ticks: 0,
        }
    }
}

impl SimClock {
    pub fn advance(&mut self, dt: f32) {
        self.elapsed_secs += dt;
        self.ticks += 1;
    }
}
