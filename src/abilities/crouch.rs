//! Crouch: shrinks the body, stands back up once there is room overhead.

use bevy::prelude::*;

use crate::backend::PhysicsQueries;
use crate::collision::LayerMask;
use crate::controller::CharacterController;
use crate::error::{check_non_negative, ConfigError};

/// Crouch ability of a character.
///
/// The crouching flags live on [`CharacterController`], so forced uncrouches
/// from state transitions and explicit ones share the same queue.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct CrouchAbility {
    /// Vertical scale of the body while crouched.
    pub crouch_scale: f32,
    /// How far above the body the clearance probe looks.
    pub clearance_distance: f32,
    /// Radius of the clearance probe.
    pub probe_radius: f32,
    /// Layers that block standing up.
    pub clearance_mask: LayerMask,
}

impl Default for CrouchAbility {
    fn default() -> Self {
        Self {
            crouch_scale: 0.5,
            clearance_distance: 1.0,
            probe_radius: 0.4,
            clearance_mask: LayerMask::ALL,
        }
    }
}

impl CrouchAbility {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.crouch_scale.is_finite() && self.crouch_scale > 0.0 && self.crouch_scale <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "crouch_scale",
                value: self.crouch_scale,
            });
        }
        check_non_negative("clearance_distance", self.clearance_distance)?;
        check_non_negative("probe_radius", self.probe_radius)?;
        Ok(())
    }

    /// Crouch down. Returns the new height scale when it changed.
    ///
    /// Ignored in states that disallow crouching. Crouching again while an
    /// uncrouch is queued drops the queued uncrouch.
    pub fn crouch(&self, controller: &mut CharacterController) -> Option<f32> {
        if !controller.current_record().allows_crouching {
            return None;
        }
        controller.uncrouch_queued = false;
        if controller.crouching {
            return None;
        }
        controller.crouching = true;
        debug!("crouch");
        Some(self.crouch_scale)
    }

    /// Queue standing back up. It happens once the way up is clear.
    pub fn uncrouch(&self, controller: &mut CharacterController) {
        if controller.crouching {
            controller.uncrouch_queued = true;
        }
    }

    /// Retry a queued uncrouch. Returns the new height scale when it changed.
    pub fn tick(
        &self,
        controller: &mut CharacterController,
        queries: &dyn PhysicsQueries,
    ) -> Option<f32> {
        if !(controller.crouching && controller.uncrouch_queued) {
            return None;
        }
        if queries.overhead_blocked(self.probe_radius, self.clearance_distance, self.clearance_mask)
        {
            return None;
        }
        controller.crouching = false;
        controller.uncrouch_queued = false;
        debug!("uncrouch");
        Some(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EmptyQueries;
    use crate::collision::RayHit;
    use crate::move_state::{MoveStateRecord, NoListener};
    use std::cell::Cell;

    struct Ceiling {
        blocked: Cell<bool>,
    }

    impl PhysicsQueries for Ceiling {
        fn raycast(&self, _: Vec3, _: Vec3, _: f32, _: LayerMask) -> Option<RayHit> {
            None
        }

        fn overhead_blocked(&self, _: f32, _: f32, _: LayerMask) -> bool {
            self.blocked.get()
        }
    }

    #[test]
    fn crouch_and_stand_up() {
        let crouch = CrouchAbility::default();
        let mut controller = CharacterController::default();

        assert_eq!(crouch.crouch(&mut controller), Some(0.5));
        assert!(controller.crouching);
        assert_eq!(crouch.crouch(&mut controller), None);

        crouch.uncrouch(&mut controller);
        assert_eq!(crouch.tick(&mut controller, &EmptyQueries), Some(1.0));
        assert!(!controller.crouching);
    }

    #[test]
    fn blocked_uncrouch_is_retried() {
        let crouch = CrouchAbility::default();
        let mut controller = CharacterController::default();
        let ceiling = Ceiling {
            blocked: Cell::new(true),
        };
        crouch.crouch(&mut controller);
        crouch.uncrouch(&mut controller);

        for _ in 0..5 {
            assert_eq!(crouch.tick(&mut controller, &ceiling), None);
            assert!(controller.crouching);
            assert!(controller.uncrouch_queued);
        }

        ceiling.blocked.set(false);
        assert_eq!(crouch.tick(&mut controller, &ceiling), Some(1.0));
        assert!(!controller.uncrouch_queued);
    }

    #[test]
    fn cannot_crouch_while_dashing() {
        let crouch = CrouchAbility::default();
        let mut controller = CharacterController::default();
        controller.transition(MoveStateRecord::dashing(), &mut NoListener);
        assert_eq!(crouch.crouch(&mut controller), None);
        assert!(!controller.crouching);
    }

    #[test]
    fn forced_uncrouch_waits_for_clearance() {
        let crouch = CrouchAbility::default();
        let mut controller = CharacterController::default();
        let ceiling = Ceiling {
            blocked: Cell::new(true),
        };
        crouch.crouch(&mut controller);

        controller.transition(MoveStateRecord::punching(), &mut NoListener);
        assert_eq!(crouch.tick(&mut controller, &ceiling), None);

        ceiling.blocked.set(false);
        assert_eq!(crouch.tick(&mut controller, &ceiling), Some(1.0));
    }

    #[test]
    fn crouch_scale_must_be_a_fraction() {
        let crouch = CrouchAbility {
            crouch_scale: 1.5,
            ..default()
        };
        assert!(crouch.validate().is_err());
        assert!(CrouchAbility::default().validate().is_ok());
    }
}
