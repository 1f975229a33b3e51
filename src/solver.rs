//! Velocity solver.
//!
//! Runs once per fixed step per character, in a fixed order:
//!
//! 1. read the body velocity
//! 2. update step counters, ground snapping
//! 3. pick movement axes (ground plane or climbed surface)
//! 4. pick acceleration and the effective move speed
//! 5. accel-limited steering toward the input
//! 6. drag
//! 7. jump
//! 8. gravity or climb pull
//! 9. speed clamp
//! 10. hand the velocity back and clear the contact buckets

use bevy::prelude::*;

use crate::backend::PhysicsQueries;
use crate::config::{CharacterOrientation, ControllerConfig};
use crate::controller::CharacterController;
use crate::jump::{resolve_jump, Jump};
use crate::momentum::MomentumScheduler;
use crate::move_state::MoveStateRecord;
use crate::snap::{snap_to_ground, SnapGate};

/// Physical inputs of one solver pass.
#[derive(Debug, Clone, Copy)]
pub struct SolverInput {
    /// Body velocity at the start of the step.
    pub velocity: Vec3,
    /// Body position, origin of the snap probe.
    pub position: Vec3,
    /// Gravity acceleration.
    pub gravity: Vec3,
    /// Fixed timestep.
    pub dt: f32,
}

/// Result of one solver pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOutput {
    /// Velocity to write to the body.
    pub velocity: Vec3,
    /// Jump honored this step, if any.
    pub jump: Option<Jump>,
}

/// Right/forward steering basis and the surface it lies on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementAxes {
    pub right: Vec3,
    pub forward: Vec3,
    pub normal: Vec3,
}

/// Run one solver pass for a character.
pub fn solve(
    controller: &mut CharacterController,
    config: &ControllerConfig,
    orientation: &CharacterOrientation,
    queries: &dyn PhysicsQueries,
    input: SolverInput,
) -> SolverOutput {
    let dt = input.dt;
    controller.jump_grace_steps = config.jump_grace_steps;

    // 1. Body velocity
    let mut velocity = input.velocity;
    controller.current_speed = Vec2::new(velocity.x, velocity.z).length();
    controller.current_y_speed = velocity.y;

    // 2. Counters and ground snapping
    update_state(controller, config, queries, input.position, &mut velocity);

    // 3. Movement axes
    let record = *controller.current_record();
    let axes = movement_axes(controller, orientation, &record);

    // 4. Acceleration and effective speed
    let grounded = controller.step_on_ground();
    let climbing = controller.step_climbing();
    let accel = if grounded || climbing {
        record.ground_accel
    } else {
        record.air_accel
    };
    update_move_speed(controller, grounded, dt);

    // 5. Steering
    if !record.blocks_move_input && !controller.is_idle() {
        velocity += steering_delta(controller, &axes, velocity, accel * dt);
    }

    // 6. Drag
    let drag = drag_coefficient(controller, config, &record);
    if drag > 0.0 {
        velocity *= 1.0 / (1.0 + drag * dt);
    }

    // 7. Jump
    let jump = resolve_jump(controller, config, &mut velocity);

    // 8. Gravity. Idle characters on the ground get none so they don't creep
    // down slopes.
    let resting = controller.step_on_ground() && controller.is_idle();
    if controller.step_climbing() {
        velocity -= controller.step_climb_normal() * (record.ground_accel * config.climb_pull_factor * dt);
    } else if !resting && record.has_gravity {
        velocity += input.gravity * dt;
    }

    // 9. Clamp
    velocity = clamp_velocity(controller, &record, velocity);

    // 10. Write back
    controller.velocity = velocity;
    controller.record_status();
    controller.contacts.clear();

    SolverOutput { velocity, jump }
}

fn update_state(
    controller: &mut CharacterController,
    config: &ControllerConfig,
    queries: &dyn PhysicsQueries,
    position: Vec3,
    velocity: &mut Vec3,
) {
    controller.steps_since_last_grounded = controller.steps_since_last_grounded.saturating_add(1);
    controller.steps_since_last_jump = controller.steps_since_last_jump.saturating_add(1);
    controller.steps_since_jump_tried = controller.steps_since_jump_tried.saturating_add(1);

    let supported = controller.step_climbing()
        || controller.step_on_ground()
        || try_snap(controller, config, queries, position, velocity);

    if supported {
        controller.steps_since_last_grounded = 0;
        controller.previous_wall_normal = Vec3::ZERO;
        controller.ground_normal = if controller.contacts.has_ground() {
            controller.contacts.ground_normal
        } else {
            Vec3::Y
        };
    } else {
        controller.ground_normal = Vec3::Y;
    }
}

fn try_snap(
    controller: &mut CharacterController,
    config: &ControllerConfig,
    queries: &dyn PhysicsQueries,
    position: Vec3,
    velocity: &mut Vec3,
) -> bool {
    let gate = SnapGate {
        steps_since_last_grounded: controller.steps_since_last_grounded,
        steps_since_last_jump: controller.steps_since_last_jump,
    };
    match snap_to_ground(queries, config, gate, position, velocity) {
        Some(normal) => {
            controller.contacts.set_ground(normal);
            true
        }
        None => false,
    }
}

/// Steering basis for the current step.
///
/// Climbing in a state that sets the movement axis steers across the wall:
/// right runs along it and forward points up. Otherwise the orientation's
/// right/forward are laid onto the ground plane.
pub fn movement_axes(
    controller: &CharacterController,
    orientation: &CharacterOrientation,
    record: &MoveStateRecord,
) -> MovementAxes {
    let (right, forward, normal) = if record.sets_movement_axis && controller.step_climbing() {
        let normal = record
            .surface_normal
            .unwrap_or_else(|| controller.step_climb_normal());
        (normal.cross(Vec3::Y), Vec3::Y, normal)
    } else {
        (
            orientation.right(),
            orientation.forward(),
            controller.ground_normal(),
        )
    };

    MovementAxes {
        right: project_on_plane(right, normal).normalize_or_zero(),
        forward: project_on_plane(forward, normal).normalize_or_zero(),
        normal,
    }
}

/// Advance any glide and react to a move state change.
fn update_move_speed(controller: &mut CharacterController, grounded: bool, dt: f32) {
    controller
        .momentum
        .tick(&mut controller.move_speed, grounded, dt);

    let Some((from, to)) = controller.machine.take_change() else {
        return;
    };

    if MomentumScheduler::eligible(&from, &to, controller.move_speed) {
        debug!(
            "carrying momentum {:?} -> {:?}: {} -> {}",
            from.tag, to.tag, controller.move_speed, to.speed
        );
        controller.momentum.start(to.speed, &from);
    } else {
        controller.momentum.cancel();
        controller.move_speed = to.speed;
    }
}

/// Accel-limited change of velocity toward `input * move_speed` along both
/// movement axes.
fn steering_delta(
    controller: &CharacterController,
    axes: &MovementAxes,
    velocity: Vec3,
    max_delta: f32,
) -> Vec3 {
    let input = controller.input_direction;
    let current_x = velocity.dot(axes.right);
    let current_z = velocity.dot(axes.forward);
    let target_x = input.x * controller.move_speed;
    let target_z = input.y * controller.move_speed;

    let delta_x = move_towards(current_x, target_x, max_delta) - current_x;
    let delta_z = move_towards(current_z, target_z, max_delta) - current_z;
    let mut delta = axes.right * delta_x + axes.forward * delta_z;

    if controller.step_on_wall() {
        let into_wall = delta.normalize_or_zero().dot(-controller.step_wall_normal());
        delta *= (1.0 - into_wall).clamp(0.0, 1.0);
    }

    delta
}

fn drag_coefficient(
    controller: &CharacterController,
    config: &ControllerConfig,
    record: &MoveStateRecord,
) -> f32 {
    let supported = controller.step_on_ground() || controller.step_climbing();
    if supported && controller.is_idle() && record.has_ground_drag {
        config.ground_drag
    } else if !supported && record.has_ungrounded_drag {
        config.air_drag
    } else {
        0.0
    }
}

fn clamp_velocity(
    controller: &CharacterController,
    record: &MoveStateRecord,
    velocity: Vec3,
) -> Vec3 {
    let move_speed = controller.move_speed;

    if controller.step_on_ground() || controller.step_climbing() {
        return velocity.clamp_length_max(move_speed);
    }

    let flat = Vec2::new(velocity.x, velocity.z).clamp_length_max(move_speed);
    let mut clamped = Vec3::new(flat.x, velocity.y, flat.y);

    let y_ceiling = match controller.momentum.y_ceiling() {
        Some(ceiling) => Some(ceiling),
        None if record.has_separate_y_speed => Some(record.y_speed),
        None => None,
    };
    if let Some(ceiling) = y_ceiling {
        clamped.y = clamped.y.min(ceiling);
    }

    clamped
}

#[inline]
fn project_on_plane(vector: Vec3, normal: Vec3) -> Vec3 {
    let length_squared = normal.length_squared();
    if length_squared <= f32::EPSILON {
        return vector;
    }
    vector - normal * (vector.dot(normal) / length_squared)
}

#[inline]
fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(target - current)
    }
}
