//! Entity Component System: components and state enums for AGVs, carts, and jobs.
//!
//! Entities are rows in a `bevy_ecs::World`, addressed by `Entity` id. State
//! enums are closed sum types — kept as variants rather than integer codes so
//! unhandled states are a compile error, not a silent `Option`. Cross-entity
//! references (`carrying_cart`, `current_job`, `assigned_agv`) are `Entity`
//! ids resolved through `World`/`Query` lookups, never pointers.

use bevy_ecs::prelude::{Component, Entity, Resource};

use crate::grid::Pos;

/// Per-world monotonic id counters for carts, orders, and jobs.
///
/// `Entity` already gives every spawned row a stable, world-scoped identity
/// (design note: "allocate entities in arenas keyed by stable ids"); these
/// counters only provide the human-facing sequential numbers the data model
/// calls for (`cart_id`, `order_id`, `job_id`), independent of spawn/despawn
/// order within the ECS storage itself.
#[derive(Debug, Resource)]
pub struct IdCounters {
    next_cart_id: u64,
    next_order_id: u64,
    next_job_id: u64,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            next_cart_id: 1,
            next_order_id: 1,
            next_job_id: 1,
        }
    }
}

impl IdCounters {
    pub fn next_cart_id(&mut self) -> u64 {
        let id = self.next_cart_id;
        self.next_cart_id += 1;
        id
    }

    pub fn next_order_id(&mut self) -> u64 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }

    pub fn next_job_id(&mut self) -> u64 {
        let id = self.next_job_id;
        self.next_job_id += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgvState {
    Idle,
    Moving,
    ReturningToSpawn,
    MovingToPickup,
    PickingUp,
    MovingToDropoff,
    DroppingOff,
}

/// An automated guided vehicle.
#[derive(Debug, Clone, PartialEq, Component)]
pub struct Agv {
    pub state: AgvState,
    pub pos: Pos,
    pub target: Option<Pos>,
    pub path: Vec<Pos>,
    pub path_index: usize,
    /// Fraction of the current tile-to-tile move completed, in `[0, 1)`.
    pub path_progress: f32,
    /// Set at pickup-dispatch time as a target hint; becomes the cart's actual
    /// carrier only once the pickup action timer elapses.
    pub carrying_cart: Option<Entity>,
    pub action_timer: f32,
    pub current_job: Option<Entity>,
    pub blocked_timer: f32,
    /// `blocked_timer` value at the last reroute attempt; compared by
    /// subtraction against the current `blocked_timer` to space reroutes.
    pub last_reroute: f32,
    pub is_blocked: bool,
    /// Single-tick latch: at most one in-tick reroute attempt per `update`.
    pub just_rerouted: bool,
}

impl Agv {
    pub fn new(pos: Pos) -> Self {
        Self {
            state: AgvState::Idle,
            pos,
            target: None,
            path: Vec::new(),
            path_index: 0,
            path_progress: 0.0,
            carrying_cart: None,
            action_timer: 0.0,
            current_job: None,
            blocked_timer: 0.0,
            last_reroute: 0.0,
            is_blocked: false,
            just_rerouted: false,
        }
    }

    /// The tile the AGV is about to step onto, if it is mid-path.
    pub fn next_tile(&self) -> Option<Pos> {
        if self.path_index + 1 < self.path.len() {
            Some(self.path[self.path_index + 1])
        } else {
            None
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == AgvState::Idle && self.current_job.is_none() && self.carrying_cart.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartState {
    Spawned,
    InTransit,
    Idle,
    ToBoxDepot,
    AtBoxDepot,
    InTransitToPick,
    Picking,
    InTransitToPackoff,
    AtPackoff,
    WaitingForStation,
    Completed,
}

/// A multiset of picks across stations, generated once a cart reaches Box Depot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: u64,
    pub picks: Vec<u32>,
    pub stations_to_visit: Vec<u32>,
    pub completed_stations: Vec<u32>,
}

impl Order {
    /// Generate picks `[1, 9]` quantities long, each assigned a station `1..=9`.
    pub fn generate(order_id: u64, rng: &mut impl rand::RngCore) -> Self {
        use rand::Rng;
        let length = rng.gen_range(1..=9);
        let picks: Vec<u32> = (0..length).map(|_| rng.gen_range(1..=9)).collect();
        let mut stations_to_visit: Vec<u32> = picks.clone();
        stations_to_visit.sort_unstable();
        stations_to_visit.dedup();
        Self {
            order_id,
            picks,
            stations_to_visit,
            completed_stations: Vec::new(),
        }
    }

    pub fn items_at_station(&self, station_num: u32) -> usize {
        self.picks.iter().filter(|&&p| p == station_num).count()
    }

    pub fn next_station(&self) -> Option<u32> {
        self.stations_to_visit
            .iter()
            .copied()
            .find(|s| !self.completed_stations.contains(s))
    }

    pub fn remaining_stations(&self) -> Vec<u32> {
        self.stations_to_visit
            .iter()
            .copied()
            .filter(|s| !self.completed_stations.contains(s))
            .collect()
    }

    pub fn complete_station(&mut self, station_num: u32) {
        self.completed_stations.push(station_num);
    }

    pub fn all_picked(&self) -> bool {
        self.completed_stations.len() == self.stations_to_visit.len()
    }
}

/// A passive carrier; stationary until an AGV picks it up.
#[derive(Debug, Clone, PartialEq, Component)]
pub struct Cart {
    pub cart_id: u64,
    pub state: CartState,
    pub pos: Pos,
    pub carried_by: Option<Entity>,
    pub order: Option<Order>,
    pub process_timer: f32,
    /// The pick station currently being dwelled at, set when a `MoveToPick`
    /// job completes and cleared once that station's items are picked.
    /// Decouples the station `cart_processing` dwells at from
    /// `Order::next_station`, which is only a default ordering hint — the
    /// dispatcher may route to any remaining station for load balancing.
    pub current_station: Option<u32>,
}

impl Cart {
    pub fn new(cart_id: u64, pos: Pos) -> Self {
        Self {
            cart_id,
            state: CartState::Spawned,
            pos,
            carried_by: None,
            order: None,
            process_timer: 0.0,
            current_station: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    PickupToBoxDepot,
    MoveToPick,
    MoveToPackoff,
    ReturnToBoxDepot,
    MoveToBuffer,
}

/// A transport task pairing a cart with a target position and a job type.
/// Lifecycle (pending/active) is tracked by list membership in
/// [`crate::dispatch::Dispatcher`], not a field on the component.
#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct Job {
    pub job_id: u64,
    pub job_type: JobType,
    pub cart: Entity,
    pub target_pos: Pos,
    pub station_id: Option<String>,
    pub assigned_agv: Option<Entity>,
}

impl Job {
    pub fn new(job_id: u64, job_type: JobType, cart: Entity, target_pos: Pos) -> Self {
        Self {
            job_id,
            job_type,
            cart,
            target_pos,
            station_id: None,
            assigned_agv: None,
        }
    }

    pub fn with_station(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = Some(station_id.into());
        self
    }
}
