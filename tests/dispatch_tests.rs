mod support;

use agv_warehouse_sim::dispatch::Dispatcher;
use agv_warehouse_sim::ecs::{Agv, Cart, CartState, Job, Order};
use agv_warehouse_sim::grid::{Pos, StationCapacities, TileKind, TileMapResource};
use agv_warehouse_sim::runner::tick;
use agv_warehouse_sim::scenario::spawn_cart;
use bevy_ecs::prelude::Entity;

use support::world::{spawn_agv_at, TestWorldBuilder};

/// E6: S1 at 3/5 (tier 2) loses out to S3 empty (tier 1) even though S1
/// comes first in the cart's remaining-stations list.
#[test]
fn e6_capacity_based_routing_skips_a_saturated_station() {
    let mut world = TestWorldBuilder::new().with_seed(3).build();

    let s1_tiles: Vec<Pos> = {
        let tiles = &world.resource::<TileMapResource>().0;
        tiles
            .iter()
            .filter(|(_, t)| t.kind == TileKind::PickStation && t.station_id.as_deref() == Some("S1"))
            .map(|(&p, _)| p)
            .collect()
    };
    assert_eq!(s1_tiles.len(), 5, "S1 has 5 pick-station tiles total");
    for pos in s1_tiles.into_iter().take(3) {
        spawn_cart(&mut world, pos);
    }

    let mut cart = Cart::new(999, Pos::new(20, 20));
    cart.state = CartState::WaitingForStation;
    cart.order = Some(Order {
        order_id: 1,
        picks: vec![1, 3],
        stations_to_visit: vec![1, 3],
        completed_stations: vec![],
    });
    let cart_entity = world.spawn(cart).id();

    tick(&mut world, 0.1);

    let job = world
        .query::<&Job>()
        .iter(&world)
        .find(|j| j.cart == cart_entity)
        .expect("a job should have been created for the waiting cart");
    assert_eq!(job.station_id.as_deref(), Some("S3"));
}

/// Station fill never exceeds the reference capacity table, across a running
/// simulation with more carts than any one station can hold at once.
#[test]
fn station_fill_never_exceeds_capacity_during_a_run() {
    let mut world = TestWorldBuilder::new().with_seed(11).build();
    spawn_agv_at(&mut world, Pos::new(1, 0));
    spawn_agv_at(&mut world, Pos::new(2, 0));
    spawn_agv_at(&mut world, Pos::new(3, 0));
    for _ in 0..6 {
        spawn_cart(&mut world, agv_warehouse_sim::grid::CART_SPAWN_TILE);
    }

    for _ in 0..300 {
        tick(&mut world, 1.0);
        let capacities = world.resource::<StationCapacities>().clone();
        let dispatcher = world.resource::<Dispatcher>();
        let fill = dispatcher.current_station_fill(&world, &capacities);
        for (station, f) in &fill {
            assert!(f.current <= f.capacity, "{station} over capacity: {f:?}");
        }
    }
}

/// No two active jobs are ever assigned to the same AGV at once.
#[test]
fn no_agv_is_assigned_more_than_one_active_job() {
    let mut world = TestWorldBuilder::new().with_seed(21).build();
    spawn_agv_at(&mut world, Pos::new(1, 0));
    spawn_agv_at(&mut world, Pos::new(2, 0));
    for _ in 0..8 {
        spawn_cart(&mut world, agv_warehouse_sim::grid::CART_SPAWN_TILE);
    }

    for _ in 0..200 {
        tick(&mut world, 1.0);
        let dispatcher = world.resource::<Dispatcher>();
        let mut assigned: Vec<Entity> = dispatcher
            .active_jobs
            .iter()
            .filter_map(|&job_entity| world.get::<Job>(job_entity))
            .filter_map(|job| job.assigned_agv)
            .collect();
        let before = assigned.len();
        assigned.sort();
        assigned.dedup();
        assert_eq!(assigned.len(), before, "an AGV was assigned two active jobs");

        let agvs_with_jobs = world
            .query::<&Agv>()
            .iter(&world)
            .filter(|a| a.current_job.is_some())
            .count();
        assert!(agvs_with_jobs <= 2);
    }
}
