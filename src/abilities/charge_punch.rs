//! Charge-punch: hold to wind up, release or fill up to lunge.

use bevy::prelude::*;

use super::{once_timer, project_on_ground, tick_timer, AbilityAction};
use crate::config::CharacterOrientation;
use crate::controller::CharacterController;
use crate::error::{check_duration, check_non_negative, ConfigError};
use crate::move_state::{MoveStateListener, MoveStateTag, StateRequest};

/// Charge percentages this close to full count as full.
const FULL_CHARGE_EPSILON: f32 = 1e-4;

/// Charge-punch ability of a character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct ChargePunchAbility {
    /// Impulse of the punch lunge.
    pub punch_force: f32,
    /// Seconds before the next charge can start.
    pub punch_cooldown: f32,
    /// Seconds spent in the punching state.
    pub punch_duration: f32,
    /// Seconds to fill the charge.
    pub charge_duration: f32,

    charge_percent: f32,
    charging: bool,
    /// Whether the charging/punching state is still ours to revert.
    needs_reset: bool,
    #[reflect(ignore)]
    cooldown: Option<Timer>,
    #[reflect(ignore)]
    revert: Option<Timer>,
}

impl Default for ChargePunchAbility {
    fn default() -> Self {
        Self::new(50.0, 2.0, 0.5, 1.5)
    }
}

impl ChargePunchAbility {
    pub fn new(
        punch_force: f32,
        punch_cooldown: f32,
        punch_duration: f32,
        charge_duration: f32,
    ) -> Self {
        Self {
            punch_force,
            punch_cooldown,
            punch_duration,
            charge_duration,
            charge_percent: 0.0,
            charging: false,
            needs_reset: false,
            cooldown: None,
            revert: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("punch_force", self.punch_force)?;
        check_duration("punch_cooldown", self.punch_cooldown)?;
        check_duration("punch_duration", self.punch_duration)?;
        check_duration("charge_duration", self.charge_duration)?;
        Ok(())
    }

    /// Check if a charge can be started.
    pub fn is_ready(&self) -> bool {
        self.cooldown.as_ref().is_none_or(Timer::finished)
    }

    pub fn is_charging(&self) -> bool {
        self.charging
    }

    /// Charge fill in `[0, 1]`.
    pub fn charge_percent(&self) -> f32 {
        self.charge_percent
    }

    /// Begin winding up. Silent no-op while on cooldown or already charging.
    pub fn start_charge(&mut self) -> AbilityAction {
        if !self.is_ready() || self.charging {
            return AbilityAction::NONE;
        }
        self.charging = true;
        self.charge_percent = 0.0;
        self.needs_reset = true;
        debug!("charge start");
        AbilityAction::request(StateRequest::Enter(MoveStateTag::Charging))
    }

    /// Release the charge.
    ///
    /// Cancelling, or releasing before the charge is full, reverts to the
    /// default state without a punch. Releasing a full charge punches. Either
    /// way the cooldown starts.
    pub fn end_charge(
        &mut self,
        canceled: bool,
        controller: &CharacterController,
        orientation: &CharacterOrientation,
    ) -> AbilityAction {
        if !self.charging {
            return AbilityAction::NONE;
        }
        if !canceled && self.charge_percent >= 1.0 {
            return self.punch(controller, orientation);
        }

        self.charging = false;
        self.charge_percent = 0.0;
        self.start_cooldown();
        debug!("charge canceled");
        if self.needs_reset {
            self.needs_reset = false;
            AbilityAction::request(StateRequest::Reset)
        } else {
            AbilityAction::NONE
        }
    }

    /// Advance timers and the charge fill by one step.
    ///
    /// The punch fires on the step the fill reaches 1.
    pub fn tick(
        &mut self,
        dt: f32,
        controller: &CharacterController,
        orientation: &CharacterOrientation,
    ) -> AbilityAction {
        if let Some(cooldown) = self.cooldown.as_mut() {
            tick_timer(cooldown, dt);
        }

        if self.charging {
            self.charge_percent += dt / self.charge_duration;
            if self.charge_percent >= 1.0 - FULL_CHARGE_EPSILON {
                self.charge_percent = 1.0;
                return self.punch(controller, orientation);
            }
            return AbilityAction::NONE;
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

    fn punch(
        &mut self,
        controller: &CharacterController,
        orientation: &CharacterOrientation,
    ) -> AbilityAction {
        self.charging = false;
        self.charge_percent = 0.0;
        self.start_cooldown();
        self.needs_reset = true;
        self.revert = Some(once_timer(self.punch_duration));

        let direction = project_on_ground(orientation.forward(), controller.ground_normal());
        debug!("punch along {direction}");
        AbilityAction::launch(MoveStateTag::Punching, direction * self.punch_force)
    }

    fn start_cooldown(&mut self) {
        self.cooldown = Some(once_timer(self.punch_cooldown));
    }

    /// Drop the charge without touching the state machine. A charge in
    /// progress still costs the cooldown.
    fn cancel_silently(&mut self) {
        if self.charging {
            self.start_cooldown();
        }
        self.charging = false;
        self.charge_percent = 0.0;
        self.revert = None;
    }
}

impl MoveStateListener for ChargePunchAbility {
    fn on_move_state_changed(&mut self, state: MoveStateTag) {
        if state != MoveStateTag::Charging && state != MoveStateTag::Punching {
            self.needs_reset = false;
            self.cancel_silently();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn charging() -> (ChargePunchAbility, CharacterController, CharacterOrientation) {
        let mut ability = ChargePunchAbility::new(40.0, 1.0, 0.5, 0.5);
        let action = ability.start_charge();
        assert_eq!(action.request, Some(StateRequest::Enter(MoveStateTag::Charging)));
        (
            ability,
            CharacterController::default(),
            CharacterOrientation::default(),
        )
    }

    #[test]
    fn punch_fires_on_the_crossing_tick() {
        let (mut ability, controller, orientation) = charging();
        // 0.5s charge at 60Hz: full on step 30.
        for step in 1..30 {
            let action = ability.tick(DT, &controller, &orientation);
            assert!(action.is_none(), "punched early on step {step}");
            assert!(ability.charge_percent() < 1.0);
        }

        let action = ability.tick(DT, &controller, &orientation);
        assert_eq!(action.request, Some(StateRequest::Enter(MoveStateTag::Punching)));
        assert!(action.zero_velocity);
        assert!((action.impulse - Vec3::NEG_Z * 40.0).length() < 1e-4);
        assert!(!ability.is_charging());
        assert!(!ability.is_ready());
    }

    #[test]
    fn early_release_cancels_without_punch() {
        let (mut ability, controller, orientation) = charging();
        for _ in 0..10 {
            ability.tick(DT, &controller, &orientation);
        }

        let action = ability.end_charge(false, &controller, &orientation);

        assert_eq!(action.request, Some(StateRequest::Reset));
        assert_eq!(action.impulse, Vec3::ZERO);
        assert_eq!(ability.charge_percent(), 0.0);
        assert!(!ability.is_ready());
    }

    #[test]
    fn canceled_charge_starts_cooldown() {
        let (mut ability, controller, orientation) = charging();
        ability.tick(DT, &controller, &orientation);

        let action = ability.end_charge(true, &controller, &orientation);

        assert_eq!(action.request, Some(StateRequest::Reset));
        assert!(!ability.is_ready());
        assert!(ability.start_charge().is_none());

        // 1s cooldown at 60Hz.
        for _ in 0..61 {
            ability.tick(DT, &controller, &orientation);
        }
        assert!(ability.is_ready());
        assert!(ability.start_charge().request.is_some());
    }

    #[test]
    fn punch_reverts_after_duration() {
        let (mut ability, controller, orientation) = charging();
        while ability.is_charging() {
            ability.tick(DT, &controller, &orientation);
        }
        ability.on_move_state_changed(MoveStateTag::Punching);

        let mut reverted = None;
        for step in 0..60 {
            let action = ability.tick(DT, &controller, &orientation);
            if action.request.is_some() {
                reverted = Some((step, action.request));
                break;
            }
        }
        let (step, request) = reverted.unwrap();
        assert_eq!(request, Some(StateRequest::Reset));
        assert!((29..=30).contains(&step));
    }

    #[test]
    fn start_is_gated_by_cooldown() {
        let (mut ability, controller, orientation) = charging();
        while ability.is_charging() {
            ability.tick(DT, &controller, &orientation);
        }
        assert!(ability.start_charge().is_none());
    }

    #[test]
    fn pre_empted_charge_cancels_silently() {
        let (mut ability, controller, orientation) = charging();
        ability.tick(DT, &controller, &orientation);

        ability.on_move_state_changed(MoveStateTag::Dashing);

        assert!(!ability.is_charging());
        assert_eq!(ability.charge_percent(), 0.0);
        assert!(!ability.is_ready());
        assert!(ability.end_charge(true, &controller, &orientation).is_none());
        for _ in 0..60 {
            assert!(ability.tick(DT, &controller, &orientation).is_none());
        }
    }

    #[test]
    fn end_charge_when_idle_is_noop() {
        let mut ability = ChargePunchAbility::default();
        let controller = CharacterController::default();
        let orientation = CharacterOrientation::default();
        assert!(ability.end_charge(false, &controller, &orientation).is_none());
    }
}
