//! Dash: a cooldown-gated burst along the input direction.

use bevy::prelude::*;

use super::{once_timer, project_on_ground, tick_timer, AbilityAction};
use crate::config::CharacterOrientation;
use crate::controller::CharacterController;
use crate::error::{check_duration, check_non_negative, ConfigError};
use crate::move_state::{MoveStateListener, MoveStateTag, StateRequest};

/// Dash ability of a character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct DashAbility {
    /// Impulse applied along the dash direction.
    pub dash_force: f32,
    /// Seconds before the next dash.
    pub dash_cooldown: f32,
    /// Seconds spent in the dashing state.
    pub dash_duration: f32,

    #[reflect(ignore)]
    cooldown: Option<Timer>,
    #[reflect(ignore)]
    revert: Option<Timer>,
    /// Whether the dashing state is still ours to revert.
    needs_reset: bool,
}

impl Default for DashAbility {
    fn default() -> Self {
        Self::new(50.0, 2.0, 0.5)
    }
}

impl DashAbility {
    pub fn new(dash_force: f32, dash_cooldown: f32, dash_duration: f32) -> Self {
        Self {
            dash_force,
            dash_cooldown,
            dash_duration,
            cooldown: None,
            revert: None,
            needs_reset: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("dash_force", self.dash_force)?;
        check_duration("dash_cooldown", self.dash_cooldown)?;
        check_duration("dash_duration", self.dash_duration)?;
        Ok(())
    }

    /// Check if a dash can be started.
    pub fn is_ready(&self) -> bool {
        self.cooldown.as_ref().is_none_or(Timer::finished)
    }

    /// Whether a revert back to the default state is still pending.
    pub fn is_dashing(&self) -> bool {
        self.needs_reset
    }

    /// Start a dash along `direction` (local: `x` = strafe, `y` = forward).
    ///
    /// A zero direction dashes forward. Silent no-op while on cooldown.
    pub fn dash(
        &mut self,
        direction: Vec2,
        controller: &CharacterController,
        orientation: &CharacterOrientation,
    ) -> AbilityAction {
        if !self.is_ready() {
            return AbilityAction::NONE;
        }
        self.cooldown = Some(once_timer(self.dash_cooldown));

        let direction = if direction == Vec2::ZERO {
            orientation.forward()
        } else {
            orientation.to_world(direction)
        };
        let direction = project_on_ground(direction, controller.ground_normal());

        self.needs_reset = true;
        self.revert = Some(once_timer(self.dash_duration));
        debug!("dash along {direction}");

        AbilityAction::launch(MoveStateTag::Dashing, direction * self.dash_force)
    }

    /// Advance cooldown and revert timers by one step.
    pub fn tick(&mut self, dt: f32) -> AbilityAction {
        if let Some(cooldown) = self.cooldown.as_mut() {
            tick_timer(cooldown, dt);
        }

        let Some(revert) = self.revert.as_mut() else {
            return AbilityAction::NONE;
        };
        tick_timer(revert, dt);
        if !revert.finished() {
            return AbilityAction::NONE;
        }

        self.revert = None;
        if self.needs_reset {
            self.needs_reset = false;
            AbilityAction::request(StateRequest::Reset)
        } else {
            AbilityAction::NONE
        }
    }
}

impl MoveStateListener for DashAbility {
    fn on_move_state_changed(&mut self, state: MoveStateTag) {
        if state != MoveStateTag::Dashing {
            self.needs_reset = false;
            self.revert = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn dash_launches_forward_on_zero_input() {
        let mut dash = DashAbility::default();
        let controller = CharacterController::default();
        let orientation = CharacterOrientation::default();

        let action = dash.dash(Vec2::ZERO, &controller, &orientation);

        assert_eq!(action.request, Some(StateRequest::Enter(MoveStateTag::Dashing)));
        assert!(action.zero_velocity);
        assert!((action.impulse - Vec3::NEG_Z * 50.0).length() < 1e-4);
        assert!(!dash.is_ready());
    }

    #[test]
    fn dash_follows_strafe_input() {
        let mut dash = DashAbility::default();
        let controller = CharacterController::default();
        let orientation = CharacterOrientation::default();

        let action = dash.dash(Vec2::X, &controller, &orientation);

        assert!((action.impulse - Vec3::X * 50.0).length() < 1e-4);
    }

    #[test]
    fn second_dash_within_cooldown_is_noop() {
        let mut dash = DashAbility::default();
        let controller = CharacterController::default();
        let orientation = CharacterOrientation::default();

        dash.dash(Vec2::ZERO, &controller, &orientation);
        dash.tick(DT);
        let second = dash.dash(Vec2::ZERO, &controller, &orientation);

        assert!(second.is_none());
    }

    #[test]
    fn dash_ready_again_after_cooldown() {
        let mut dash = DashAbility::new(10.0, 0.1, 0.05);
        let controller = CharacterController::default();
        let orientation = CharacterOrientation::default();

        dash.dash(Vec2::ZERO, &controller, &orientation);
        for _ in 0..7 {
            dash.tick(DT);
        }
        assert!(dash.is_ready());
    }

    #[test]
    fn dash_reverts_after_duration() {
        let mut dash = DashAbility::new(10.0, 1.0, 0.05);
        let controller = CharacterController::default();
        let orientation = CharacterOrientation::default();
        dash.dash(Vec2::ZERO, &controller, &orientation);

        // 0.05s is three steps at 60Hz.
        assert!(dash.tick(DT).is_none());
        assert!(dash.tick(DT).is_none());
        let mut reverted = dash.tick(DT);
        if reverted.is_none() {
            reverted = dash.tick(DT);
        }
        assert_eq!(reverted.request, Some(StateRequest::Reset));
        assert!(!dash.is_dashing());
    }

    #[test]
    fn pre_empted_dash_does_not_revert() {
        let mut dash = DashAbility::new(10.0, 1.0, 0.05);
        let controller = CharacterController::default();
        let orientation = CharacterOrientation::default();
        dash.dash(Vec2::ZERO, &controller, &orientation);
        dash.on_move_state_changed(MoveStateTag::Dashing);
        assert!(dash.is_dashing());

        dash.on_move_state_changed(MoveStateTag::Charging);
        for _ in 0..10 {
            assert!(dash.tick(DT).is_none());
        }
    }

    #[test]
    fn dash_rejects_zero_duration() {
        assert!(DashAbility::new(10.0, 1.0, 0.0).validate().is_err());
        assert!(DashAbility::default().validate().is_ok());
    }
}
