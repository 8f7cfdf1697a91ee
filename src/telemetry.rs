//! Throughput and bottleneck reporting over a `Dispatcher`'s running history.
//!
//! No export path (CSV/parquet) is carried here — only the in-memory
//! summaries a headless run or a caller's own logging needs.

use std::collections::HashMap;

use bevy_ecs::prelude::World;

use crate::dispatch::{Dispatcher, StationFill};
use crate::ecs::{Agv, Cart, CartState, Job, JobType};

/// Throughput and fleet-utilization snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputStats {
    pub completed_orders: u64,
    pub average_cycle_time: Option<f32>,
    pub orders_per_hour: f32,
    pub active_jobs: usize,
    pub pending_jobs: usize,
}

pub fn throughput_stats(dispatcher: &Dispatcher, elapsed_secs: f32) -> ThroughputStats {
    let hours = elapsed_secs / 3600.0;
    ThroughputStats {
        completed_orders: dispatcher.completed_orders,
        average_cycle_time: dispatcher.average_cycle_time(),
        orders_per_hour: if hours > 0.0 {
            dispatcher.completed_orders as f32 / hours
        } else {
            0.0
        },
        active_jobs: dispatcher.active_jobs.len(),
        pending_jobs: dispatcher.pending_jobs.len(),
    }
}

fn job_types(world: &World, dispatcher: &Dispatcher) -> Vec<(JobType, Option<String>)> {
    dispatcher
        .pending_jobs
        .iter()
        .chain(dispatcher.active_jobs.iter())
        .filter_map(|&job_entity| world.get::<Job>(job_entity))
        .map(|job| (job.job_type, job.station_id.clone()))
        .collect()
}

/// Short strings for congestion a caller should surface: a full Pack-off,
/// a backed-up Pack-off queue, each saturated pick station with its queued
/// job count, and a full Box Depot with spawned carts still waiting.
pub fn bottleneck_alerts(
    world: &World,
    dispatcher: &Dispatcher,
    fill: &HashMap<String, StationFill>,
) -> Vec<String> {
    let mut alerts = Vec::new();
    let jobs = job_types(world, dispatcher);

    if fill.get("Pack_off").map(|f| f.current >= f.capacity).unwrap_or(false) {
        alerts.push("Pack-off FULL".to_string());
    }
    let packoff_queue = jobs.iter().filter(|(t, _)| *t == JobType::MoveToPackoff).count();
    if packoff_queue > 3 {
        alerts.push("Pack-off queue > 3".to_string());
    }

    let mut station_ids: Vec<&String> = fill.keys().filter(|id| id.starts_with('S')).collect();
    station_ids.sort();
    for sid in station_ids {
        let f = &fill[sid];
        if f.current >= f.capacity {
            let waiting = jobs
                .iter()
                .filter(|(t, s)| *t == JobType::MoveToPick && s.as_deref() == Some(sid.as_str()))
                .count();
            alerts.push(format!("{sid} FULL ({waiting} waiting)"));
        }
    }

    if fill.get("Box_Depot").map(|f| f.current >= f.capacity).unwrap_or(false) {
        let spawned = world
            .query::<&Cart>()
            .iter(world)
            .filter(|c| c.state == CartState::Spawned)
            .count();
        alerts.push(format!("Box Depot FULL ({spawned} spawned)"));
    }

    alerts
}

/// Final metrics bundle for a headless run.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMetrics {
    pub num_agvs: usize,
    pub num_carts: usize,
    pub completed_orders: u64,
    pub orders_per_hour: f32,
    pub avg_cycle_time: Option<f32>,
    pub cycle_times: Vec<f32>,
    /// `1 − idle_ticks/total_ticks`, pooled across every AGV over the run.
    pub agv_utilization: f32,
    pub agv_blocked_fraction: f32,
    pub station_fill: HashMap<String, StationFill>,
    pub sim_duration: f32,
    pub wall_clock_seconds: f32,
    pub total_ticks: u64,
}

/// Count of idle and blocked AGVs this tick, and the fleet size, for pooled
/// accumulation into [`HeadlessMetrics::agv_utilization`]/`agv_blocked_fraction`
/// by the caller's tick loop.
pub fn fleet_tick_sample(world: &World) -> (usize, usize, usize) {
    let mut idle = 0;
    let mut blocked = 0;
    let mut total = 0;
    for agv in world.query::<&Agv>().iter(world) {
        total += 1;
        idle += agv.is_free() as usize;
        blocked += agv.is_blocked as usize;
    }
    (idle, blocked, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{build_map, Pos};

    fn fill_with(entries: &[(&str, u32, u32)]) -> HashMap<String, StationFill> {
        entries
            .iter()
            .map(|&(id, current, capacity)| {
                let fill_rate = if capacity > 0 { current as f32 / capacity as f32 } else { 0.0 };
                (
                    id.to_string(),
                    StationFill {
                        current,
                        capacity,
                        fill_rate,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn pack_off_full_produces_the_exact_alert_string() {
        let world = World::new();
        let dispatcher = Dispatcher::new(&build_map());
        let fill = fill_with(&[("Pack_off", 4, 4)]);
        let alerts = bottleneck_alerts(&world, &dispatcher, &fill);
        assert_eq!(alerts, vec!["Pack-off FULL".to_string()]);
    }

    #[test]
    fn saturated_station_reports_its_queued_pick_job_count() {
        let mut world = World::new();
        let mut dispatcher = Dispatcher::new(&build_map());
        let cart = world.spawn(Cart::new(1, Pos::new(0, 0))).id();
        let job = Job::new(1, JobType::MoveToPick, cart, Pos::new(0, 0)).with_station("S2");
        let job_entity = world.spawn(job).id();
        dispatcher.pending_jobs.push(job_entity);

        let fill = fill_with(&[("S2", 4, 4)]);
        let alerts = bottleneck_alerts(&world, &dispatcher, &fill);
        assert_eq!(alerts, vec!["S2 FULL (1 waiting)".to_string()]);
    }

    #[test]
    fn box_depot_full_counts_spawned_carts() {
        let mut world = World::new();
        world.spawn(Cart::new(1, Pos::new(0, 0)));
        let mut other = Cart::new(2, Pos::new(0, 0));
        other.state = CartState::AtBoxDepot;
        world.spawn(other);
        let dispatcher = Dispatcher::new(&build_map());

        let fill = fill_with(&[("Box_Depot", 8, 8)]);
        let alerts = bottleneck_alerts(&world, &dispatcher, &fill);
        assert_eq!(alerts, vec!["Box Depot FULL (1 spawned)".to_string()]);
    }

    #[test]
    fn no_alerts_when_nothing_is_at_capacity() {
        let world = World::new();
        let dispatcher = Dispatcher::new(&build_map());
        let fill = fill_with(&[("S1", 1, 5), ("Pack_off", 2, 4)]);
        assert!(bottleneck_alerts(&world, &dispatcher, &fill).is_empty());
    }
}
