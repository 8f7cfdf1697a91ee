//! Deadlock and liveness handling: stuck-job cancellation, blocked-AGV reroute
//! escalation, and idle-AGV parking.

use bevy_ecs::prelude::{Entity, World};

use super::stations::find_buffer_spot;
use super::Dispatcher;
use crate::ecs::{Agv, AgvState, Cart, CartState, IdCounters, Job, JobType};
use crate::grid::{Graph, TileMapResource, AGV_SPAWN_TILE};
use crate::pathfinding::astar;
use crate::scenario::ScenarioParams;

/// Cancel jobs whose AGV has made no progress for `job_cancel_timeout`
/// seconds. Heading to pick up (not yet carrying), the job is simply
/// re-queued for a fresh pickup attempt. Carrying toward dropoff, the cart is
/// set down where the AGV stands and a new `move_to_buffer` job takes over —
/// the original job's target is no longer reachable by this AGV, and the
/// cart can't just restart the same trip from mid-carry.
pub fn cancel_stuck_jobs(dispatcher: &mut Dispatcher, world: &mut World, _dt: f32) {
    let timeout = world.resource::<ScenarioParams>().job_cancel_timeout;

    let mut requeue = Vec::new();
    let mut buffer_candidates = Vec::new();
    let mut still_active = Vec::new();
    for job_entity in dispatcher.active_jobs.clone() {
        let Some(job) = world.get::<Job>(job_entity).cloned() else {
            continue;
        };
        let Some(agv_entity) = job.assigned_agv else {
            still_active.push(job_entity);
            continue;
        };
        let Some(agv) = world.get::<Agv>(agv_entity).cloned() else {
            still_active.push(job_entity);
            continue;
        };
        if !(agv.is_blocked && agv.blocked_timer >= timeout) {
            still_active.push(job_entity);
            continue;
        }

        let carrying = agv.carrying_cart == Some(job.cart);

        if let Some(mut agv) = world.get_mut::<Agv>(agv_entity) {
            agv.current_job = None;
            agv.target = None;
            agv.path = Vec::new();
            agv.path_index = 0;
            agv.path_progress = 0.0;
            agv.carrying_cart = None;
            agv.state = AgvState::Idle;
            agv.is_blocked = false;
            agv.blocked_timer = 0.0;
        }

        if carrying {
            // Set down where the AGV stands. `waiting_for_station` makes the
            // cart retryable by `create_jobs` even if no buffer tile is free
            // right now — it doesn't have to be the `move_to_buffer` job below.
            if let Some(mut cart) = world.get_mut::<Cart>(job.cart) {
                cart.carried_by = None;
                cart.pos = agv.pos;
                cart.state = CartState::WaitingForStation;
            }
            buffer_candidates.push((job_entity, job));
        } else {
            requeue.push(job_entity);
        }
    }

    if !buffer_candidates.is_empty() {
        let tiles = world.resource::<TileMapResource>().0.clone();
        let occupied: std::collections::HashSet<_> = world
            .query::<&Agv>()
            .iter(world)
            .map(|a| a.pos)
            .chain(
                world
                    .query::<&Cart>()
                    .iter(world)
                    .filter(|c| c.carried_by.is_none())
                    .map(|c| c.pos),
            )
            .collect();

        for (job_entity, job) in buffer_candidates {
            world.despawn(job_entity);
            let near = world.get::<Cart>(job.cart).map(|c| c.pos).unwrap_or(job.target_pos);
            if let Some(buffer) = find_buffer_spot(&tiles, near, &occupied) {
                let job_id = world.resource_mut::<IdCounters>().next_job_id();
                let new_job = Job::new(job_id, JobType::MoveToBuffer, job.cart, buffer);
                let new_job_entity = world.spawn(new_job).id();
                dispatcher.pending_jobs.push(new_job_entity);
            }
        }
    }

    dispatcher.active_jobs = still_active;
    dispatcher.pending_jobs.extend(requeue);
}

/// React to AGVs [`crate::systems::movement`] already flagged as blocked this
/// tick: past `block_timeout`, nudge an idle blocker out of the way if one is
/// sitting on the waited-on tile, or attempt a reroute once `reroute_cooldown`
/// has elapsed since the last attempt. Timers themselves only advance in
/// movement — this only reacts to them.
pub fn handle_blocked_agvs(_dispatcher: &mut Dispatcher, world: &mut World, _dt: f32) {
    let block_timeout = world.resource::<ScenarioParams>().block_timeout;
    let reroute_cooldown = world.resource::<ScenarioParams>().reroute_cooldown;
    let graph = world.resource::<Graph>().clone();

    let occupied: std::collections::HashMap<crate::grid::Pos, Entity> = world
        .query::<(Entity, &Agv)>()
        .iter(world)
        .map(|(e, a)| (a.pos, e))
        .collect();

    let waiters: Vec<Entity> = world
        .query::<(Entity, &Agv)>()
        .iter(world)
        .filter(|(_, a)| a.is_blocked && a.blocked_timer >= block_timeout)
        .map(|(e, _)| e)
        .collect();

    for entity in waiters {
        let Some(waiter) = world.get::<Agv>(entity).cloned() else {
            continue;
        };
        let Some(next) = waiter.next_tile() else { continue };
        let blocker_entity = occupied.get(&next).copied();

        if let Some(blocker_entity) = blocker_entity {
            let blocker_free = world.get::<Agv>(blocker_entity).map(Agv::is_free).unwrap_or(false);
            if blocker_free {
                if let Some(buffer) = super::stations::find_buffer_spot(
                    &world.resource::<crate::grid::TileMapResource>().0,
                    waiter.pos,
                    &occupied.keys().copied().collect(),
                ) {
                    if let Some(path) = astar(&graph, waiter.pos, buffer, None, None) {
                        if let Some(mut blocker) = world.get_mut::<Agv>(blocker_entity) {
                            blocker.path = path;
                            blocker.path_index = 0;
                            blocker.path_progress = 0.0;
                            blocker.target = Some(buffer);
                            blocker.state = AgvState::Moving;
                        }
                    }
                }
                if let Some(mut waiter_mut) = world.get_mut::<Agv>(entity) {
                    waiter_mut.blocked_timer = 0.0;
                }
                continue;
            }
        }

        if waiter.blocked_timer - waiter.last_reroute < reroute_cooldown {
            continue;
        }
        let mut blocked: std::collections::HashSet<_> = occupied.keys().copied().collect();
        blocked.remove(&waiter.pos);
        let Some(target) = waiter.target else { continue };
        let rerouted = astar(&graph, waiter.pos, target, Some(&blocked), None)
            .filter(|path| path.get(1) != Some(&next));
        if let Some(mut agv) = world.get_mut::<Agv>(entity) {
            agv.last_reroute = agv.blocked_timer;
            if let Some(path) = rerouted {
                agv.path = path;
                agv.path_index = 0;
                agv.path_progress = 0.0;
                agv.just_rerouted = true;
            }
        }
    }
}

/// Send any free, unparked AGV back toward the spawn zone.
pub fn park_idle_agvs(_dispatcher: &mut Dispatcher, world: &mut World) {
    let graph = world.resource::<Graph>().clone();
    let candidates: Vec<Entity> = world
        .query::<(Entity, &Agv)>()
        .iter(world)
        .filter(|(_, agv)| agv.is_free() && agv.pos != AGV_SPAWN_TILE && agv.path.is_empty())
        .map(|(e, _)| e)
        .collect();

    for entity in candidates {
        let pos = world.get::<Agv>(entity).map(|a| a.pos);
        let Some(pos) = pos else { continue };
        if let Some(path) = astar(&graph, pos, AGV_SPAWN_TILE, None, None) {
            if let Some(mut agv) = world.get_mut::<Agv>(entity) {
                agv.path = path;
                agv.path_index = 0;
                agv.path_progress = 0.0;
                agv.target = Some(AGV_SPAWN_TILE);
                agv.state = AgvState::ReturningToSpawn;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::IdCounters;
    use crate::grid::{build_map, Pos};

    fn world_with_resources() -> World {
        let mut world = World::new();
        world.insert_resource(ScenarioParams::default());
        world.insert_resource(TileMapResource(build_map()));
        world.insert_resource(IdCounters::default());
        world
    }

    #[test]
    fn pickup_leg_cancellation_frees_the_agv_and_requeues_the_same_job() {
        let mut world = world_with_resources();
        let mut dispatcher = Dispatcher::new(&build_map());

        let cart = world.spawn(Cart::new(1, Pos::new(3, 3))).id();
        let mut agv = Agv::new(Pos::new(2, 3));
        agv.state = AgvState::MovingToPickup;
        agv.carrying_cart = Some(cart);
        agv.is_blocked = true;
        agv.blocked_timer = 999.0;
        let agv_entity = world.spawn(agv).id();

        let job = Job::new(1, JobType::MoveToPick, cart, Pos::new(5, 5)).with_station("S1");
        let job_entity = world.spawn(job).id();
        let mut job_mut = world.get_mut::<Job>(job_entity).unwrap();
        job_mut.assigned_agv = Some(agv_entity);
        drop(job_mut);
        dispatcher.active_jobs.push(job_entity);

        cancel_stuck_jobs(&mut dispatcher, &mut world, 0.1);

        assert!(dispatcher.active_jobs.is_empty());
        assert_eq!(dispatcher.pending_jobs, vec![job_entity]);
        let agv = world.get::<Agv>(agv_entity).unwrap();
        assert!(agv.is_free());
        assert!(!agv.is_blocked);
        assert!(agv.path.is_empty());
    }

    #[test]
    fn dropoff_leg_cancellation_frees_the_cart_and_spawns_a_buffer_job() {
        let mut world = world_with_resources();
        let mut dispatcher = Dispatcher::new(&build_map());

        let cart_entity = world.spawn(Cart::new(1, Pos::new(10, 10))).id();
        let mut agv = Agv::new(Pos::new(10, 10));
        agv.state = AgvState::MovingToDropoff;
        agv.carrying_cart = Some(cart_entity);
        agv.is_blocked = true;
        agv.blocked_timer = 999.0;
        let agv_entity = world.spawn(agv).id();

        let job = Job::new(1, JobType::MoveToPackoff, cart_entity, Pos::new(40, 8));
        let job_entity = world.spawn(job).id();
        let mut job_mut = world.get_mut::<Job>(job_entity).unwrap();
        job_mut.assigned_agv = Some(agv_entity);
        drop(job_mut);
        dispatcher.active_jobs.push(job_entity);

        cancel_stuck_jobs(&mut dispatcher, &mut world, 0.1);

        assert!(dispatcher.active_jobs.is_empty());
        assert_eq!(dispatcher.pending_jobs.len(), 1);
        let new_job_entity = dispatcher.pending_jobs[0];
        assert_ne!(new_job_entity, job_entity, "the original job must be replaced, not reused");
        let new_job = world.get::<Job>(new_job_entity).unwrap();
        assert_eq!(new_job.job_type, JobType::MoveToBuffer);
        assert_eq!(new_job.cart, cart_entity);

        let agv = world.get::<Agv>(agv_entity).unwrap();
        assert!(agv.is_free());
        let cart = world.get::<Cart>(cart_entity).unwrap();
        assert_eq!(cart.carried_by, None);
    }
}
