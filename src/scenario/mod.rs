//! Scenario construction: tunable parameters and world/entity builders.

pub mod build;
pub mod params;

pub use build::{build_world, spawn_agv, spawn_cart};
pub use params::{HeadlessRunConfig, LayoutConfig, ScenarioParams};
