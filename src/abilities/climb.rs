//! Climb: holds the climbing state while a climbable wall is in reach.
//!
//! Unlike dash and punch there is no timer. Every step the live climb
//! contacts decide whether the character is climbing, and the state follows.
//! The pull into the wall is part of the solver's gravity step.

use bevy::prelude::*;

use super::AbilityAction;
use crate::controller::CharacterController;
use crate::move_state::{MoveStateListener, MoveStateTag, StateRequest};

/// Climb ability of a character.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ClimbAbility {
    is_climbing: bool,
    /// Whether the climbing state is still ours to revert.
    needs_reset: bool,
}

impl ClimbAbility {
    pub fn is_climbing(&self) -> bool {
        self.is_climbing
    }

    /// Re-evaluate from this step's contacts.
    ///
    /// Climbing only starts from the default state, so a dash or punch in
    /// flight is never interrupted by touching a wall.
    pub fn tick(&mut self, controller: &CharacterController) -> AbilityAction {
        self.is_climbing = controller.step_climbing();
        let state = controller.move_state();

        if !self.needs_reset && self.is_climbing && state == MoveStateTag::Default {
            self.needs_reset = true;
            debug!("climb start");
            AbilityAction::request(StateRequest::Enter(MoveStateTag::Climbing))
        } else if self.needs_reset && !self.is_climbing {
            self.needs_reset = false;
            debug!("climb end");
            AbilityAction::request(StateRequest::Reset)
        } else {
            AbilityAction::NONE
        }
    }
}

impl MoveStateListener for ClimbAbility {
    fn on_move_state_changed(&mut self, state: MoveStateTag) {
        if state != MoveStateTag::Climbing {
            self.is_climbing = false;
            self.needs_reset = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ContactSample;
    use crate::config::ControllerConfig;
    use crate::contact::ContactAccumulator;
    use crate::move_state::{MoveStateSet, NoListener};

    fn controller_on_wall(climb_held: bool) -> CharacterController {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::default();
        controller.steps_since_last_jump = 100;
        controller.climb(climb_held);
        controller.contacts = ContactAccumulator::classify(
            &[ContactSample::on_any_layer(Vec3::Z)],
            &config.contact_thresholds(),
            climb_held,
            Vec3::NEG_Z,
        );
        controller
    }

    #[test]
    fn climb_starts_when_wall_is_held() {
        let mut climb = ClimbAbility::default();
        let controller = controller_on_wall(true);

        let action = climb.tick(&controller);

        assert_eq!(action.request, Some(StateRequest::Enter(MoveStateTag::Climbing)));
        assert!(climb.is_climbing());
    }

    #[test]
    fn no_climb_without_intent() {
        let mut climb = ClimbAbility::default();
        let controller = controller_on_wall(false);
        assert!(climb.tick(&controller).is_none());
    }

    #[test]
    fn climb_ends_when_contact_is_lost() {
        let mut climb = ClimbAbility::default();
        let mut controller = controller_on_wall(true);
        climb.tick(&controller);
        climb.on_move_state_changed(MoveStateTag::Climbing);

        controller.contacts.clear();
        let action = climb.tick(&controller);

        assert_eq!(action.request, Some(StateRequest::Reset));
    }

    #[test]
    fn climb_does_not_interrupt_dash() {
        let states = MoveStateSet::default();
        let mut climb = ClimbAbility::default();
        let mut controller = controller_on_wall(true);
        controller.transition(states.dashing, &mut NoListener);

        assert!(climb.tick(&controller).is_none());
    }

    #[test]
    fn pre_empted_climb_does_not_reset() {
        let mut climb = ClimbAbility::default();
        let mut controller = controller_on_wall(true);
        climb.tick(&controller);
        climb.on_move_state_changed(MoveStateTag::Dashing);

        controller.contacts.clear();
        assert!(climb.tick(&controller).is_none());
    }
}
