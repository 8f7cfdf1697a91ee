mod support;

use agv_warehouse_sim::dispatch::Dispatcher;
use agv_warehouse_sim::ecs::{Cart, CartState};
use agv_warehouse_sim::grid::{AGV_SPAWN_TILE, CART_SPAWN_TILE};
use agv_warehouse_sim::runner::tick;
use agv_warehouse_sim::scenario::spawn_cart;

use support::world::{spawn_agv_at, TestWorldBuilder};

/// E1: a single cart, with a single AGV available, runs its full lifecycle
/// unassisted — spawn, box depot, pick, pack-off, and back to box depot with
/// a fresh order — within a generous tick budget.
#[test]
fn e1_single_cart_completes_a_full_order_cycle() {
    let mut world = TestWorldBuilder::new().with_seed(1).build();
    spawn_agv_at(&mut world, AGV_SPAWN_TILE);
    let cart_entity = spawn_cart(&mut world, CART_SPAWN_TILE);

    let mut seen_at_box_depot = false;
    let mut seen_picking = false;
    let mut seen_at_packoff = false;

    let dt = 1.0;
    let max_ticks = 20_000;
    let mut completed = false;
    for _ in 0..max_ticks {
        tick(&mut world, dt);

        if let Some(cart) = world.get::<Cart>(cart_entity) {
            match cart.state {
                CartState::AtBoxDepot => seen_at_box_depot = true,
                CartState::Picking => seen_picking = true,
                CartState::AtPackoff => seen_at_packoff = true,
                _ => {}
            }
        }

        if world.resource::<Dispatcher>().completed_orders >= 1 {
            completed = true;
            break;
        }
    }

    assert!(completed, "cart did not complete a full cycle within {max_ticks} ticks");
    assert!(seen_at_box_depot, "cart never reached the box depot");
    assert!(seen_picking, "cart never visited a pick station");
    assert!(seen_at_packoff, "cart never reached pack-off");
}

/// With no AGVs at all, a spawned cart is never picked up and no order ever
/// completes — the dispatcher must not fabricate movement.
#[test]
fn cart_with_no_agv_available_never_completes() {
    let mut world = TestWorldBuilder::new().with_seed(2).build();
    spawn_cart(&mut world, CART_SPAWN_TILE);

    for _ in 0..500 {
        tick(&mut world, 1.0);
    }

    assert_eq!(world.resource::<Dispatcher>().completed_orders, 0);
}
