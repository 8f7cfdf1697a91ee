//! Job creation: inspects idle carts and produces the next job each one needs.

use bevy_ecs::prelude::{Entity, World};

use super::stations::{find_buffer_spot, find_tile, pick_best_station, station_fill};
use super::Dispatcher;
use crate::clock::SimClock;
use crate::ecs::{Cart, CartState, IdCounters, Job, JobType, Order};
use crate::grid::{StationCapacities, TileKind, TileMapResource};
use crate::rng::WorldRng;

/// Does `cart` already have a pending or active job?
pub fn has_job(dispatcher: &Dispatcher, world: &World, cart: Entity) -> bool {
    dispatcher
        .pending_jobs
        .iter()
        .chain(dispatcher.active_jobs.iter())
        .any(|&job_entity| {
            world
                .get::<Job>(job_entity)
                .map(|job| job.cart == cart)
                .unwrap_or(false)
        })
}

fn reserved_tiles(world: &mut World, dispatcher: &Dispatcher) -> std::collections::HashSet<crate::grid::Pos> {
    let mut reserved = std::collections::HashSet::new();
    for cart in world.query::<&Cart>().iter(world) {
        if cart.carried_by.is_none() {
            reserved.insert(cart.pos);
        }
    }
    for &job_entity in dispatcher.pending_jobs.iter().chain(dispatcher.active_jobs.iter()) {
        if let Some(job) = world.get::<Job>(job_entity) {
            reserved.insert(job.target_pos);
        }
    }
    reserved
}

/// Assign a freshly generated order to every Box Depot cart that lacks one.
fn assign_orders(world: &mut World) {
    let candidates: Vec<Entity> = world
        .query::<(Entity, &Cart)>()
        .iter(world)
        .filter(|(_, c)| c.state == CartState::AtBoxDepot && c.order.is_none())
        .map(|(e, _)| e)
        .collect();

    for cart_entity in candidates {
        let order_id = world.resource_mut::<IdCounters>().next_order_id();
        let order = {
            let mut rng = world.resource_mut::<WorldRng>();
            Order::generate(order_id, &mut rng.0)
        };
        if let Some(mut cart) = world.get_mut::<Cart>(cart_entity) {
            cart.order = Some(order);
        }
    }
}

/// Scan every cart and enqueue the single next job it needs, if any and if
/// it doesn't already have one in flight.
pub fn create_jobs(dispatcher: &mut Dispatcher, world: &mut World) {
    assign_orders(world);

    let tiles = world.resource::<TileMapResource>().0.clone();
    let capacities = world.resource::<StationCapacities>().clone();
    let reserved = reserved_tiles(world, dispatcher);
    let fill = station_fill(&dispatcher.station_tiles, &capacities, &reserved);

    let carts: Vec<(Entity, Cart)> = world
        .query::<(Entity, &Cart)>()
        .iter(world)
        .map(|(e, c)| (e, c.clone()))
        .collect();

    for (cart_entity, cart) in carts {
        if has_job(dispatcher, world, cart_entity) {
            continue;
        }

        let needed = match cart.state {
            CartState::Spawned => Some(JobType::PickupToBoxDepot),
            CartState::AtBoxDepot if cart.process_timer <= 0.0 => cart
                .order
                .as_ref()
                .filter(|o| !o.all_picked())
                .map(|_| JobType::MoveToPick),
            // `process_timer <= 0.0` here means the cart just finished (or never
            // started) a dwell, not that it's mid-pick: while actively dwelling,
            // `cart_processing` sets the timer positive again within the same
            // tick, before dispatch ever sees it.
            CartState::Picking if cart.process_timer <= 0.0 => {
                let remaining = cart.order.as_ref().map(Order::remaining_stations).unwrap_or_default();
                Some(if remaining.is_empty() {
                    JobType::MoveToPackoff
                } else {
                    JobType::MoveToPick
                })
            }
            // `at_packoff` waits for its dwell timer; `cart_processing` moves it
            // to `Completed` once elapsed, which is what actually requests the
            // return-to-depot job.
            CartState::Completed => Some(JobType::ReturnToBoxDepot),
            CartState::WaitingForStation => {
                let remaining = cart.order.as_ref().map(Order::remaining_stations).unwrap_or_default();
                if remaining.is_empty() {
                    Some(JobType::MoveToPackoff)
                } else {
                    Some(JobType::MoveToPick)
                }
            }
            _ => None,
        };

        let Some(job_type) = needed else { continue };

        let station_id = if job_type == JobType::MoveToPick {
            let remaining = cart.order.as_ref().map(Order::remaining_stations).unwrap_or_default();
            pick_best_station(&remaining, cart.pos, &dispatcher.station_tiles, &fill).map(|s| format!("S{s}"))
        } else {
            None
        };

        let direct_target = match job_type {
            JobType::PickupToBoxDepot | JobType::ReturnToBoxDepot => {
                find_tile(&dispatcher.station_tiles, "Box_Depot", TileKind::Parking, &reserved)
            }
            JobType::MoveToPackoff => {
                find_tile(&dispatcher.station_tiles, "Pack_off", TileKind::Parking, &reserved)
            }
            JobType::MoveToPick => station_id
                .as_deref()
                .and_then(|sid| find_tile(&dispatcher.station_tiles, sid, TileKind::PickStation, &reserved)),
            JobType::MoveToBuffer => None,
        };

        let (resolved_type, resolved_station, target_pos) = match direct_target {
            Some(pos) => (job_type, station_id, pos),
            None => match find_buffer_spot(&tiles, cart.pos, &reserved) {
                Some(pos) => (JobType::MoveToBuffer, None, pos),
                None => continue,
            },
        };

        let job_id = world.resource_mut::<IdCounters>().next_job_id();
        let mut job = Job::new(job_id, resolved_type, cart_entity, target_pos);
        if let Some(sid) = resolved_station {
            job = job.with_station(sid);
        }
        let job_entity = world.spawn(job).id();
        dispatcher.pending_jobs.push(job_entity);

        let now = world.resource::<SimClock>().elapsed_secs;
        dispatcher.cart_start_times.entry(cart_entity).or_insert(now);
    }
}
