//! AGV per-tick movement: advances each AGV along its planned path one tile
//! at a time, in a fixed, deterministic iteration order (ascending `Entity`),
//! so a later AGV in the order always sees the tiles earlier ones vacated or
//! occupied this same tick. Also performs the pickup/dropoff action itself
//! once its dwell timer elapses — the only place `Cart::carried_by` changes.

use bevy_ecs::prelude::{Entity, World};

use crate::ecs::{Agv, AgvState, Cart, CartState};
use crate::scenario::ScenarioParams;

fn finish_action(world: &mut World, entity: Entity) {
    let Some(mut agv) = world.get_mut::<Agv>(entity) else {
        return;
    };
    let state = agv.state;
    let pos = agv.pos;
    let cart_entity = agv.carrying_cart;
    agv.action_timer = 0.0;
    agv.state = AgvState::Idle;
    drop(agv);

    let Some(cart_entity) = cart_entity else { return };
    let Some(mut cart) = world.get_mut::<Cart>(cart_entity) else {
        return;
    };
    match state {
        AgvState::PickingUp => {
            cart.carried_by = Some(entity);
            cart.state = CartState::InTransit;
            cart.pos = pos;
        }
        AgvState::DroppingOff => {
            cart.carried_by = None;
            cart.state = CartState::Idle;
            cart.pos = pos;
            drop(cart);
            if let Some(mut agv) = world.get_mut::<Agv>(entity) {
                agv.carrying_cart = None;
            }
        }
        _ => {}
    }
}

/// Advance every AGV's action timer and path position by `dt`.
pub fn advance(world: &mut World, dt: f32) {
    let agv_speed = world.resource::<ScenarioParams>().agv_speed;

    let mut entities: Vec<Entity> = world.query::<Entity>().iter(world).collect();
    entities.sort();

    for entity in entities {
        let mid_action = world
            .get::<Agv>(entity)
            .map(|a| matches!(a.state, AgvState::PickingUp | AgvState::DroppingOff))
            .unwrap_or(false);

        if mid_action {
            let Some(mut agv) = world.get_mut::<Agv>(entity) else {
                continue;
            };
            agv.action_timer -= dt;
            let done = agv.action_timer <= 0.0;
            drop(agv);
            if done {
                finish_action(world, entity);
            }
            continue;
        }

        let mut occupied: std::collections::HashSet<_> =
            world.query::<&Agv>().iter(world).map(|a| a.pos).collect();
        occupied.extend(
            world
                .query::<&Cart>()
                .iter(world)
                .filter(|c| c.carried_by.is_none())
                .map(|c| c.pos),
        );
        // A carrying AGV may pass its own stationary pickup target — the one
        // tile it's about to clear by picking the cart up — but never another
        // AGV's tile, nor any other parked cart's.
        let carrying_own_cart_tile = world.get::<Agv>(entity).and_then(|agv| {
            agv.carrying_cart.and_then(|c| world.get::<Cart>(c)).map(|c| c.pos)
        });

        let Some(mut agv) = world.get_mut::<Agv>(entity) else {
            continue;
        };

        let Some(next) = agv.next_tile() else {
            if matches!(
                agv.state,
                AgvState::Moving | AgvState::ReturningToSpawn | AgvState::MovingToPickup | AgvState::MovingToDropoff
            ) {
                agv.state = AgvState::Idle;
            }
            continue;
        };

        let blocked = occupied.contains(&next) && Some(next) != carrying_own_cart_tile;
        if blocked {
            agv.is_blocked = true;
            agv.blocked_timer += dt;
            agv.path_progress = agv.path_progress.min(0.99);
            continue;
        }
        agv.is_blocked = false;
        agv.blocked_timer = 0.0;
        agv.just_rerouted = false;

        agv.path_progress += agv_speed * dt;
        while agv.path_progress >= 1.0 && agv.path_index + 1 < agv.path.len() {
            agv.path_progress -= 1.0;
            agv.path_index += 1;
            agv.pos = agv.path[agv.path_index];
        }

        if agv.path_index + 1 >= agv.path.len() {
            agv.state = match agv.state {
                AgvState::MovingToPickup => {
                    agv.action_timer = pickup_time(world);
                    AgvState::PickingUp
                }
                AgvState::MovingToDropoff => {
                    agv.action_timer = dropoff_time(world);
                    AgvState::DroppingOff
                }
                _ => AgvState::Idle,
            };
        }
    }
}

fn pickup_time(world: &World) -> f32 {
    world.resource::<ScenarioParams>().pickup_time
}

fn dropoff_time(world: &World) -> f32 {
    world.resource::<ScenarioParams>().dropoff_time
}
