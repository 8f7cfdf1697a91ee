#![allow(dead_code)]

use agv_warehouse_sim::grid::Pos;
use agv_warehouse_sim::scenario::{build_world, spawn_agv, spawn_cart, LayoutConfig};
use bevy_ecs::prelude::{Entity, World};

/// Builder for reproducible test worlds over the reference layout.
#[derive(Clone, Debug)]
pub struct TestWorldConfig {
    pub seed: u64,
}

impl Default for TestWorldConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

#[derive(Debug, Default)]
pub struct TestWorldBuilder {
    config: TestWorldConfig,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn build(self) -> World {
        build_world(self.config.seed, LayoutConfig)
    }
}

pub fn spawn_agv_at(world: &mut World, pos: Pos) -> Entity {
    spawn_agv(world, pos).expect("test spawn should not conflict")
}

pub fn spawn_cart_at(world: &mut World, pos: Pos) -> Entity {
    spawn_cart(world, pos)
}
