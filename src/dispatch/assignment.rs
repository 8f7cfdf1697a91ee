//! Job assignment to free AGVs, and per-tick progress of active jobs.
//!
//! A job's travel is two legs: dispatch sends the AGV to the cart's current
//! position (pickup leg); once it has actually picked the cart up, [`progress_jobs`]
//! sends it on to the job's real target (dropoff leg). Completion is driven
//! by AGV/cart state, not by raw position — [`crate::systems::movement`] is
//! what actually performs the pickup/dropoff action and clears the cart's
//! carrier link, [`progress_jobs`] just reacts to it.

use bevy_ecs::prelude::{Entity, World};

use super::Dispatcher;
use crate::clock::SimClock;
use crate::ecs::{Agv, AgvState, Cart, CartState, Job, JobType};
use crate::grid::Graph;
use crate::pathfinding::astar;
use crate::scenario::ScenarioParams;

fn transit_state_for(job_type: JobType) -> CartState {
    match job_type {
        JobType::PickupToBoxDepot | JobType::ReturnToBoxDepot => CartState::ToBoxDepot,
        JobType::MoveToPick => CartState::InTransitToPick,
        JobType::MoveToPackoff => CartState::InTransitToPackoff,
        JobType::MoveToBuffer => CartState::InTransit,
    }
}

/// Hand pending jobs to free AGVs, nearest-first (to the cart), up to
/// `max_concurrent_dispatches` total active jobs. Dispatches toward the
/// cart's own position — the pickup leg — not the job's final target.
pub fn assign_jobs(dispatcher: &mut Dispatcher, world: &mut World) {
    let cap = world.resource::<ScenarioParams>().max_concurrent_dispatches;
    if dispatcher.active_jobs.len() >= cap {
        return;
    }

    let mut free_agvs: Vec<(Entity, crate::grid::Pos)> = world
        .query::<(Entity, &Agv)>()
        .iter(world)
        .filter(|(_, agv)| agv.is_free())
        .map(|(e, agv)| (e, agv.pos))
        .collect();
    if free_agvs.is_empty() {
        return;
    }

    let graph = world.resource::<Graph>().clone();

    let mut remaining_pending = Vec::new();
    for &job_entity in &dispatcher.pending_jobs {
        if dispatcher.active_jobs.len() >= cap || free_agvs.is_empty() {
            remaining_pending.push(job_entity);
            continue;
        }
        let Some(job) = world.get::<Job>(job_entity).cloned() else {
            continue;
        };
        let Some(cart_pos) = world.get::<Cart>(job.cart).map(|c| c.pos) else {
            continue;
        };

        free_agvs.sort_by_key(|&(_, pos)| pos.manhattan(cart_pos));
        let Some(idx) = free_agvs
            .iter()
            .position(|&(_, pos)| astar(&graph, pos, cart_pos, None, None).is_some())
        else {
            remaining_pending.push(job_entity);
            continue;
        };
        let (agv_entity, agv_pos) = free_agvs.remove(idx);

        let Some(path) = astar(&graph, agv_pos, cart_pos, None, None) else {
            remaining_pending.push(job_entity);
            continue;
        };

        if let Some(mut agv) = world.get_mut::<Agv>(agv_entity) {
            agv.path = path;
            agv.path_index = 0;
            agv.path_progress = 0.0;
            agv.target = Some(cart_pos);
            agv.current_job = Some(job_entity);
            // Target hint only; the cart isn't actually carried until pickup completes.
            agv.carrying_cart = Some(job.cart);
            agv.state = AgvState::MovingToPickup;
        }
        if let Some(mut job_mut) = world.get_mut::<Job>(job_entity) {
            job_mut.assigned_agv = Some(agv_entity);
        }
        dispatcher.active_jobs.push(job_entity);

        let now = world.resource::<SimClock>().elapsed_secs;
        dispatcher.cart_start_times.entry(job.cart).or_insert(now);
    }
    dispatcher.pending_jobs = remaining_pending;
}

/// Advance each active job's carry through its two legs, and complete jobs
/// whose dropoff has finished.
pub fn progress_jobs(dispatcher: &mut Dispatcher, world: &mut World, _dt: f32) {
    let active = dispatcher.active_jobs.clone();
    let mut still_active = Vec::new();
    let graph = world.resource::<Graph>().clone();

    for job_entity in active {
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
        let cart_carrier = world.get::<Cart>(job.cart).map(|c| c.carried_by);

        let just_picked_up = agv.state == AgvState::Idle
            && agv.carrying_cart == Some(job.cart)
            && cart_carrier == Some(Some(agv_entity));
        let just_dropped_off = agv.state == AgvState::Idle
            && agv.current_job == Some(job_entity)
            && agv.carrying_cart.is_none()
            && cart_carrier == Some(None);

        if just_picked_up {
            if let Some(mut cart) = world.get_mut::<Cart>(job.cart) {
                cart.state = transit_state_for(job.job_type);
            }
            if let Some(path) = astar(&graph, agv.pos, job.target_pos, None, None) {
                if let Some(mut agv) = world.get_mut::<Agv>(agv_entity) {
                    agv.path = path;
                    agv.path_index = 0;
                    agv.path_progress = 0.0;
                    agv.target = Some(job.target_pos);
                    agv.state = AgvState::MovingToDropoff;
                }
            }
            still_active.push(job_entity);
        } else if just_dropped_off {
            complete_job(dispatcher, world, job_entity, &job, agv_entity);
        } else {
            still_active.push(job_entity);
        }
    }

    dispatcher.active_jobs = still_active;
}

fn complete_job(dispatcher: &mut Dispatcher, world: &mut World, job_entity: Entity, job: &Job, agv_entity: Entity) {
    match job.job_type {
        JobType::PickupToBoxDepot => {
            if let Some(mut cart) = world.get_mut::<Cart>(job.cart) {
                cart.state = CartState::AtBoxDepot;
                cart.process_timer = world.resource::<ScenarioParams>().box_depot_time;
            }
        }
        JobType::MoveToPick => {
            let station_num: Option<u32> = job
                .station_id
                .as_deref()
                .and_then(|s| s.strip_prefix('S'))
                .and_then(|n| n.parse().ok());
            let pick_time_per_item = world.resource::<ScenarioParams>().pick_time_per_item;
            if let Some(mut cart) = world.get_mut::<Cart>(job.cart) {
                let items = station_num
                    .and_then(|n| cart.order.as_ref().map(|o| o.items_at_station(n)))
                    .unwrap_or(0);
                cart.state = CartState::Picking;
                cart.current_station = station_num;
                cart.process_timer = pick_time_per_item * items as f32;
                if let Some(n) = station_num {
                    if let Some(order) = cart.order.as_mut() {
                        order.complete_station(n);
                    }
                }
            }
        }
        JobType::MoveToPackoff => {
            if let Some(mut cart) = world.get_mut::<Cart>(job.cart) {
                cart.state = CartState::AtPackoff;
                cart.process_timer = world.resource::<ScenarioParams>().packoff_time;
            }
        }
        JobType::ReturnToBoxDepot => {
            if let Some(mut cart) = world.get_mut::<Cart>(job.cart) {
                cart.state = CartState::AtBoxDepot;
                cart.order = None;
                cart.process_timer = world.resource::<ScenarioParams>().box_depot_time;
            }
            let now = world.resource::<SimClock>().elapsed_secs;
            if let Some(start) = dispatcher.cart_start_times.remove(&job.cart) {
                dispatcher.cycle_times.push(now - start);
            }
            dispatcher.completed_orders += 1;
        }
        JobType::MoveToBuffer => {
            if let Some(mut cart) = world.get_mut::<Cart>(job.cart) {
                cart.state = CartState::WaitingForStation;
            }
        }
    }

    if let Some(mut agv) = world.get_mut::<Agv>(agv_entity) {
        agv.current_job = None;
        agv.target = None;
    }
    world.despawn(job_entity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Order;
    use crate::grid::{build_map, Pos};

    #[test]
    fn move_to_pick_completion_starts_the_dwell_and_marks_the_station_immediately() {
        let mut world = World::new();
        world.insert_resource(ScenarioParams::default());
        let mut dispatcher = Dispatcher::new(&build_map());

        let mut cart = Cart::new(1, Pos::new(0, 0));
        cart.order = Some(Order {
            order_id: 1,
            picks: vec![3, 3],
            stations_to_visit: vec![3],
            completed_stations: vec![],
        });
        let cart_entity = world.spawn(cart).id();
        let agv_entity = world.spawn(Agv::new(Pos::new(0, 0))).id();
        let job = Job::new(1, JobType::MoveToPick, cart_entity, Pos::new(0, 0)).with_station("S3");
        let job_entity = world.spawn(job.clone()).id();

        complete_job(&mut dispatcher, &mut world, job_entity, &job, agv_entity);

        let cart = world.get::<Cart>(cart_entity).unwrap();
        assert_eq!(cart.state, CartState::Picking);
        assert_eq!(cart.current_station, Some(3));
        assert_eq!(cart.process_timer, ScenarioParams::default().pick_time_per_item * 2.0);
        assert_eq!(cart.order.as_ref().unwrap().completed_stations, vec![3]);
    }
}
