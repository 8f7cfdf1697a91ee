//! Seeded, world-scoped RNG.
//!
//! Order generation and headless pre-placement draw from this resource only —
//! nothing in the engine touches `rand::thread_rng()`. Two runs built with the
//! same seed produce bit-identical results.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Resource)]
pub struct WorldRng(pub StdRng);

impl WorldRng {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}
