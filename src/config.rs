//! Controller configuration components.
//!
//! This module defines the tuning shared by every move state: jump forces,
//! ground snapping, slope and climb angle limits, and drag coefficients.
//! Per-state speeds and accelerations live in [`crate::move_state`].

use bevy::prelude::*;

use crate::collision::LayerMask;
use crate::contact::ContactThresholds;
use crate::error::{check_angle, check_non_negative, ConfigError};

/// Cosine of an angle in degrees, with the float noise around 90° removed
/// so that perpendicular vectors sit exactly on the threshold.
fn cos_degrees(degrees: f32) -> f32 {
    let cos = degrees.to_radians().cos();
    if cos.abs() < 1e-6 {
        0.0
    } else {
        cos
    }
}

/// First-person facing of a character.
///
/// Only the yaw matters for locomotion: the camera look system owns pitch.
/// The horizontal axes (forward/right for steering) are derived from the yaw
/// around world up.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct CharacterOrientation {
    /// Rotation around world up, in radians. Zero faces `-Z`.
    yaw: f32,
}

impl CharacterOrientation {
    /// Create an orientation from a yaw angle in radians.
    pub fn from_yaw(yaw: f32) -> Self {
        Self { yaw }
    }

    /// Create an orientation facing a direction.
    ///
    /// Only the horizontal part of `direction` is used. Falls back to the
    /// default facing if it has none.
    pub fn from_forward(direction: Vec3) -> Self {
        let flat = Vec3::new(direction.x, 0.0, direction.z);
        if flat.length_squared() <= f32::EPSILON {
            return Self::default();
        }
        Self {
            yaw: (-flat.x).atan2(-flat.z),
        }
    }

    /// Get the yaw angle in radians.
    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Set the yaw angle in radians.
    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    /// Rotation around world up for the current yaw.
    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// Get the facing direction on the horizontal plane.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    /// Get the strafe-right direction on the horizontal plane.
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation() * Vec3::X
    }

    /// World up. Locomotion always runs against world gravity.
    #[inline]
    pub fn up(&self) -> Vec3 {
        Vec3::Y
    }

    /// Convert a local input vector (`x` = strafe, `y` = forward) to world space.
    pub fn to_world(&self, local: Vec2) -> Vec3 {
        self.forward() * local.y + self.right() * local.x
    }
}

/// Configuration parameters for the character controller.
///
/// Angle limits are stored in degrees, as designers tune them, and exposed as
/// cosine thresholds through accessor methods.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    // === Jump Settings ===
    /// Upward impulse of a grounded jump.
    pub jump_force: f32,

    /// Impulse of a wall jump, applied along `normalize(wall_normal + up)`.
    pub wall_jump_force: f32,

    /// A jump request that could not be honored expires after this many steps.
    pub steps_til_jump_ignored: u32,

    /// Steps after a jump during which contact-derived predicates are forced
    /// false. Contacts lag one physics step behind the body.
    pub jump_grace_steps: u32,

    // === Ground Snapping ===
    /// Snapping is skipped above this speed (full 3D magnitude).
    pub max_snap_speed: f32,

    /// Length of the downward snap probe.
    pub snap_probe_distance: f32,

    /// Layers the snap probe can hit.
    pub snap_probe_mask: LayerMask,

    // === Angle Limits (degrees) ===
    /// Steepest surface still counted as ground.
    pub max_ground_angle: f32,

    /// A wall must differ from the last jumped-off wall by at least this angle.
    pub min_wall_jump_reset_angle: f32,

    /// Largest angle between facing and the inverted surface normal that still
    /// counts as facing a climbable wall.
    pub max_climb_facing_away_angle: f32,

    /// Steepest overhang that can still be climbed.
    pub max_climb_angle: f32,

    // === Climbing ===
    /// Layers that can be climbed.
    pub climb_mask: LayerMask,

    /// Fraction of the climbing state's ground acceleration used to pull the
    /// body into the climbed surface.
    pub climb_pull_factor: f32,

    // === Drag ===
    /// Drag coefficient while grounded and idle.
    pub ground_drag: f32,

    /// Drag coefficient while airborne in a state that requests it.
    pub air_drag: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Jump settings
            jump_force: 5.0,
            wall_jump_force: 4.0,
            steps_til_jump_ignored: 12,
            jump_grace_steps: 2,

            // Ground snapping
            max_snap_speed: 12.0,
            snap_probe_distance: 1.0,
            snap_probe_mask: LayerMask::ALL,

            // Angle limits
            max_ground_angle: 45.0,
            min_wall_jump_reset_angle: 90.0,
            max_climb_facing_away_angle: 90.0,
            max_climb_angle: 140.0,

            // Climbing
            climb_mask: LayerMask::ALL,
            climb_pull_factor: 0.9,

            // Drag
            ground_drag: 10.0,
            air_drag: 0.5,
        }
    }
}

impl ControllerConfig {
    /// Create a config tuned for a responsive player character.
    pub fn player() -> Self {
        Self {
            jump_force: 6.0,
            wall_jump_force: 5.0,
            max_snap_speed: 14.0,
            ..default()
        }
    }

    /// Cosine of [`Self::max_ground_angle`].
    #[inline]
    pub fn min_ground_dot(&self) -> f32 {
        cos_degrees(self.max_ground_angle)
    }

    /// Cosine of [`Self::min_wall_jump_reset_angle`].
    #[inline]
    pub fn max_wall_jump_dot(&self) -> f32 {
        cos_degrees(self.min_wall_jump_reset_angle)
    }

    /// Cosine of [`Self::max_climb_angle`].
    #[inline]
    pub fn min_climb_dot(&self) -> f32 {
        cos_degrees(self.max_climb_angle)
    }

    /// Cosine of [`Self::max_climb_facing_away_angle`].
    #[inline]
    pub fn min_climb_facing_away_dot(&self) -> f32 {
        cos_degrees(self.max_climb_facing_away_angle)
    }

    /// Contact classification thresholds derived from the angle limits.
    pub fn contact_thresholds(&self) -> ContactThresholds {
        ContactThresholds {
            min_ground_dot: self.min_ground_dot(),
            min_climb_dot: self.min_climb_dot(),
            min_climb_facing_away_dot: self.min_climb_facing_away_dot(),
            climb_mask: self.climb_mask,
        }
    }

    /// Check every value before the controller starts simulating.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("jump_force", self.jump_force)?;
        check_non_negative("wall_jump_force", self.wall_jump_force)?;
        check_non_negative("max_snap_speed", self.max_snap_speed)?;
        check_non_negative("snap_probe_distance", self.snap_probe_distance)?;
        check_angle("max_ground_angle", self.max_ground_angle)?;
        check_angle("min_wall_jump_reset_angle", self.min_wall_jump_reset_angle)?;
        check_angle(
            "max_climb_facing_away_angle",
            self.max_climb_facing_away_angle,
        )?;
        check_angle("max_climb_angle", self.max_climb_angle)?;
        check_non_negative("climb_pull_factor", self.climb_pull_factor)?;
        check_non_negative("ground_drag", self.ground_drag)?;
        check_non_negative("air_drag", self.air_drag)?;
        Ok(())
    }

    /// Builder: set jump impulses.
    pub fn with_jump_forces(mut self, jump: f32, wall_jump: f32) -> Self {
        self.jump_force = jump;
        self.wall_jump_force = wall_jump;
        self
    }

    /// Builder: set how long an unhonored jump request stays pending.
    pub fn with_steps_til_jump_ignored(mut self, steps: u32) -> Self {
        self.steps_til_jump_ignored = steps;
        self
    }

    /// Builder: set the post-jump contact grace window.
    pub fn with_jump_grace_steps(mut self, steps: u32) -> Self {
        self.jump_grace_steps = steps;
        self
    }

    /// Builder: set snap probe parameters.
    pub fn with_snap(mut self, max_speed: f32, probe_distance: f32) -> Self {
        self.max_snap_speed = max_speed;
        self.snap_probe_distance = probe_distance;
        self
    }

    /// Builder: set the snap probe layer mask.
    pub fn with_snap_probe_mask(mut self, mask: LayerMask) -> Self {
        self.snap_probe_mask = mask;
        self
    }

    /// Builder: set the maximum walkable slope in degrees.
    pub fn with_max_ground_angle(mut self, degrees: f32) -> Self {
        self.max_ground_angle = degrees;
        self
    }

    /// Builder: set the wall-jump reset angle in degrees.
    pub fn with_min_wall_jump_reset_angle(mut self, degrees: f32) -> Self {
        self.min_wall_jump_reset_angle = degrees;
        self
    }

    /// Builder: set climb angle limits in degrees.
    pub fn with_climb_angles(mut self, max_climb: f32, max_facing_away: f32) -> Self {
        self.max_climb_angle = max_climb;
        self.max_climb_facing_away_angle = max_facing_away;
        self
    }

    /// Builder: set the climbable layer mask.
    pub fn with_climb_mask(mut self, mask: LayerMask) -> Self {
        self.climb_mask = mask;
        self
    }

    /// Builder: set drag coefficients.
    pub fn with_drag(mut self, ground: f32, air: f32) -> Self {
        self.ground_drag = ground;
        self.air_drag = air;
        self
    }
}
