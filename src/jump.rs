//! Jump arbitration.
//!
//! A jump request is edge-triggered and stays pending for a few steps, so a
//! press slightly before landing (or before touching a wall) still jumps.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::controller::CharacterController;

/// Which surface a jump pushed off from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Ground,
    Wall,
}

/// A jump that was honored this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jump {
    pub kind: JumpKind,
    pub impulse: Vec3,
}

/// Resolve a pending jump request.
///
/// On success zeroes the vertical part of `velocity`, restarts the grace
/// window and returns the impulse to apply. A request that cannot be honored
/// stays pending until it is older than `steps_til_jump_ignored`; the step it
/// expires on still gets a last try.
pub fn resolve_jump(
    controller: &mut CharacterController,
    config: &ControllerConfig,
    velocity: &mut Vec3,
) -> Option<Jump> {
    if !controller.jump_requested {
        return None;
    }

    if controller.steps_since_jump_tried > config.steps_til_jump_ignored {
        controller.jump_requested = false;
    }

    let jump = if controller.step_on_ground() {
        Jump {
            kind: JumpKind::Ground,
            impulse: Vec3::Y * config.jump_force,
        }
    } else if controller.step_on_wall()
        && controller.previous_wall_normal.dot(controller.step_wall_normal())
            <= config.max_wall_jump_dot()
    {
        let wall_normal = controller.step_wall_normal();
        controller.previous_wall_normal = wall_normal;
        Jump {
            kind: JumpKind::Wall,
            impulse: (wall_normal + Vec3::Y).normalize_or_zero() * config.wall_jump_force,
        }
    } else {
        return None;
    };

    velocity.y = 0.0;
    controller.steps_since_last_jump = 0;
    controller.jump_requested = false;
    debug!("{:?} jump, impulse {}", jump.kind, jump.impulse);
    Some(jump)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ContactSample;
    use crate::contact::ContactAccumulator;

    fn controller_touching(normal: Vec3) -> CharacterController {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::default();
        controller.contacts = ContactAccumulator::classify(
            &[ContactSample::on_any_layer(normal)],
            &config.contact_thresholds(),
            false,
            Vec3::NEG_Z,
        );
        controller.steps_since_last_jump = 10;
        controller.try_jump();
        controller
    }

    #[test]
    fn ground_jump() {
        let config = ControllerConfig::default();
        let mut controller = controller_touching(Vec3::Y);
        let mut velocity = Vec3::new(3.0, -2.0, 0.0);

        let jump = resolve_jump(&mut controller, &config, &mut velocity).unwrap();

        assert_eq!(jump.kind, JumpKind::Ground);
        assert_eq!(jump.impulse, Vec3::Y * config.jump_force);
        assert_eq!(velocity, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(controller.steps_since_last_jump, 0);
        assert!(!controller.jump_requested);
        assert!(!controller.step_on_ground());
    }

    #[test]
    fn wall_jump_pushes_away_and_up() {
        let config = ControllerConfig::default();
        let mut controller = controller_touching(Vec3::X);
        let mut velocity = Vec3::ZERO;

        let jump = resolve_jump(&mut controller, &config, &mut velocity).unwrap();

        assert_eq!(jump.kind, JumpKind::Wall);
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize() * config.wall_jump_force;
        assert!((jump.impulse - expected).length() < 1e-5);
        assert_eq!(controller.previous_wall_normal, Vec3::X);
    }

    #[test]
    fn same_wall_twice_is_rejected() {
        let config = ControllerConfig::default();
        let mut controller = controller_touching(Vec3::X);
        controller.previous_wall_normal = Vec3::X;
        let mut velocity = Vec3::ZERO;

        assert!(resolve_jump(&mut controller, &config, &mut velocity).is_none());
        // Still pending.
        assert!(controller.jump_requested);
    }

    #[test]
    fn opposite_wall_is_accepted() {
        let config = ControllerConfig::default();
        let mut controller = controller_touching(Vec3::NEG_X);
        controller.previous_wall_normal = Vec3::X;
        let mut velocity = Vec3::ZERO;

        let jump = resolve_jump(&mut controller, &config, &mut velocity);
        assert_eq!(jump.map(|j| j.kind), Some(JumpKind::Wall));
        assert_eq!(controller.previous_wall_normal, Vec3::NEG_X);
    }

    #[test]
    fn perpendicular_wall_sits_on_threshold() {
        // 90 degree reset angle: cos = ~0, perpendicular walls are accepted.
        let config = ControllerConfig::default().with_min_wall_jump_reset_angle(90.0);
        let mut controller = controller_touching(Vec3::Z);
        controller.previous_wall_normal = Vec3::X;
        let mut velocity = Vec3::ZERO;

        assert!(resolve_jump(&mut controller, &config, &mut velocity).is_some());
    }

    #[test]
    fn expiring_request_still_jumps_off_ground() {
        let config = ControllerConfig::default();
        let mut controller = controller_touching(Vec3::Y);
        controller.steps_since_jump_tried = config.steps_til_jump_ignored + 1;
        let mut velocity = Vec3::ZERO;

        let jump = resolve_jump(&mut controller, &config, &mut velocity);

        assert_eq!(jump.map(|j| j.kind), Some(JumpKind::Ground));
        assert!(!controller.jump_requested);
    }

    #[test]
    fn expired_request_is_dropped_in_the_air() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::default();
        controller.try_jump();
        controller.steps_since_jump_tried = config.steps_til_jump_ignored + 1;
        let mut velocity = Vec3::ZERO;

        assert!(resolve_jump(&mut controller, &config, &mut velocity).is_none());
        assert!(!controller.jump_requested);

        // Landing later does not revive it.
        controller.steps_since_last_jump = 10;
        controller.contacts = ContactAccumulator::classify(
            &[ContactSample::on_any_layer(Vec3::Y)],
            &config.contact_thresholds(),
            false,
            Vec3::NEG_Z,
        );
        assert!(resolve_jump(&mut controller, &config, &mut velocity).is_none());
    }

    #[test]
    fn airborne_request_stays_pending() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::default();
        controller.try_jump();
        let mut velocity = Vec3::new(0.0, -3.0, 0.0);

        assert!(resolve_jump(&mut controller, &config, &mut velocity).is_none());
        assert!(controller.jump_requested);
        assert_eq!(velocity.y, -3.0);
    }
}
