//! World construction: resource wiring and entity spawning.

use bevy_ecs::prelude::{Entity, World};

use crate::clock::SimClock;
use crate::dispatch::Dispatcher;
use crate::ecs::{Agv, Cart, IdCounters};
use crate::error::SimError;
use crate::grid::{build_graph, build_map, default_station_capacities, Pos, StationCapacities, TileMapResource};
use crate::rng::WorldRng;
use crate::scenario::params::{LayoutConfig, ScenarioParams};

/// Build an empty world wired with the reference layout and default resources.
/// No AGVs or carts are spawned; callers place entities with [`spawn_agv`] and
/// [`spawn_cart`] (or use [`crate::runner::run_headless`] for pre-placement).
pub fn build_world(seed: u64, _layout: LayoutConfig) -> World {
    let mut world = World::new();

    let tiles = build_map();
    let graph = build_graph(&tiles);
    let capacities = default_station_capacities();
    let dispatcher = Dispatcher::new(&tiles);

    world.insert_resource(TileMapResource(tiles));
    world.insert_resource(graph);
    world.insert_resource(StationCapacities(capacities));
    world.insert_resource(ScenarioParams::default());
    world.insert_resource(SimClock::default());
    world.insert_resource(WorldRng::new(seed));
    world.insert_resource(dispatcher);
    world.insert_resource(IdCounters::default());

    world
}

/// Spawn an AGV at `pos`. Refused if another AGV already occupies that tile.
pub fn spawn_agv(world: &mut World, pos: Pos) -> Result<Entity, SimError> {
    let occupied = world.query::<&Agv>().iter(world).any(|a| a.pos == pos);
    if occupied {
        return Err(SimError::SpawnConflict { pos });
    }
    Ok(world.spawn(Agv::new(pos)).id())
}

/// Spawn a cart at `pos` in the `Spawned` state.
pub fn spawn_cart(world: &mut World, pos: Pos) -> Entity {
    let cart_id = world.resource_mut::<IdCounters>().next_cart_id();
    world.spawn(Cart::new(cart_id, pos)).id()
}
