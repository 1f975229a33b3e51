//! Ground snapping.
//!
//! Running over a crest or down a small step briefly loses every ground
//! contact. A single downward probe bridges that gap so the character stays
//! glued to the floor instead of launching off it.

use bevy::prelude::*;

use crate::backend::PhysicsQueries;
use crate::config::ControllerConfig;

/// Step counters the snap gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct SnapGate {
    pub steps_since_last_grounded: u32,
    pub steps_since_last_jump: i32,
}

impl SnapGate {
    /// Whether the probe may run at all for the given speed.
    pub fn allows(&self, config: &ControllerConfig, speed: f32) -> bool {
        self.steps_since_last_grounded <= 1
            && i64::from(self.steps_since_last_jump) > i64::from(config.jump_grace_steps)
            && speed <= config.max_snap_speed
    }
}

/// Probe for ground under `position`.
///
/// Only the gate and the probe are checked here: the caller skips snapping
/// while already grounded or climbing. On success returns the ground normal
/// and bends `velocity` onto the ground plane if it points away from it,
/// keeping its magnitude.
pub fn snap_to_ground(
    queries: &dyn PhysicsQueries,
    config: &ControllerConfig,
    gate: SnapGate,
    position: Vec3,
    velocity: &mut Vec3,
) -> Option<Vec3> {
    let speed = velocity.length();
    if !gate.allows(config, speed) {
        return None;
    }

    let hit = queries.raycast(
        position,
        Vec3::NEG_Y,
        config.snap_probe_distance,
        config.snap_probe_mask,
    )?;

    if hit.normal.y < config.min_ground_dot() {
        return None;
    }

    let dot = velocity.dot(hit.normal);
    if dot > 0.0 {
        *velocity = (*velocity - hit.normal * dot).normalize_or_zero() * speed;
    }

    trace!("snapped to ground at distance {:.3}", hit.distance);
    Some(hit.normal)
}
