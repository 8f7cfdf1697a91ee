//! Cart-side dwell timers: box-depot loading, per-item picking, and packoff.

use bevy_ecs::prelude::World;

use crate::ecs::{Cart, CartState};

/// Count down every cart's `process_timer`. When a station's dwell elapses,
/// the cart transitions out of its waiting state; [`crate::dispatch`] picks
/// up the transition on its next tick and issues the cart's next job.
///
/// A `picking` cart's `process_timer` and order completion are already set
/// at job-arrival time by [`crate::dispatch::assignment::complete_job`]; this
/// only counts the dwell down and clears `current_station` once it elapses.
pub fn advance(world: &mut World, dt: f32) {
    let mut query = world.query::<&mut Cart>();
    for mut cart in query.iter_mut(world) {
        match cart.state {
            CartState::AtBoxDepot | CartState::AtPackoff => {
                if cart.process_timer > 0.0 {
                    cart.process_timer -= dt;
                    if cart.process_timer <= 0.0 {
                        cart.process_timer = 0.0;
                        cart.state = match cart.state {
                            CartState::AtPackoff => CartState::Completed,
                            other => other,
                        };
                    }
                }
            }
            CartState::Picking => {
                if cart.current_station.is_none() {
                    continue;
                }
                if cart.process_timer > 0.0 {
                    cart.process_timer -= dt;
                }
                if cart.process_timer <= 0.0 {
                    cart.process_timer = 0.0;
                    cart.current_station = None;
                }
            }
            _ => {}
        }
    }
}
