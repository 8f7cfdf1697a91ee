//! # AGV Warehouse Simulation Core
//!
//! A fixed-timestep simulation engine for a tile-based warehouse fleet of
//! automated guided vehicles (AGVs).
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Tile Grid & Routing**: a directed graph over warehouse tiles with
//!   one-way highway loops, and a weighted A* pathfinder over it
//! - **ECS Framework**: Entity Component System state for AGVs, carts, and jobs
//! - **Dispatch**: capacity-aware job creation, assignment, and deadlock/liveness handling
//! - **Telemetry**: throughput stats and bottleneck alerts
//!
//! ## Key Concepts
//!
//! - **Fixed Timestep**: every tick advances every entity by the same `dt`
//! - **Deterministic**: seeded RNG and fixed entity iteration order make two
//!   runs with the same seed and config produce identical results
//!
//! ## Example
//!
//! ```rust,no_run
//! use agv_warehouse_sim::runner::run_headless;
//! use agv_warehouse_sim::scenario::HeadlessRunConfig;
//!
//! let metrics = run_headless(HeadlessRunConfig::default()).unwrap();
//! println!("completed orders: {}", metrics.completed_orders);
//! ```

pub mod clock;
pub mod dispatch;
pub mod ecs;
pub mod error;
pub mod grid;
pub mod pathfinding;
pub mod rng;
pub mod runner;
pub mod scenario;
pub mod systems;
pub mod telemetry;
