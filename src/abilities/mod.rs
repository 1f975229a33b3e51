//! Ability modules.
//!
//! Abilities sit on top of the solver. Each one owns its cooldown and revert
//! timers and asks for move state transitions through an [`AbilityAction`];
//! [`Abilities::apply`] performs the transition and fans the change
//! notification out to every ability, so one ability pre-empting another is
//! seen by the pre-empted one before the call returns.

use std::time::Duration;

use bevy::prelude::*;

use crate::controller::CharacterController;
use crate::move_state::{MoveStateListener, MoveStateSet, MoveStateTag, StateRequest};

pub mod charge_punch;
pub mod climb;
pub mod crouch;
pub mod dash;

pub use charge_punch::ChargePunchAbility;
pub use climb::ClimbAbility;
pub use crouch::CrouchAbility;
pub use dash::DashAbility;

/// What an ability wants done to the body and the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AbilityAction {
    pub request: Option<StateRequest>,
    /// Zero the body velocity before the impulse.
    pub zero_velocity: bool,
    pub impulse: Vec3,
}

impl AbilityAction {
    /// Nothing to do.
    pub const NONE: Self = Self {
        request: None,
        zero_velocity: false,
        impulse: Vec3::ZERO,
    };

    pub fn request(request: StateRequest) -> Self {
        Self {
            request: Some(request),
            ..Self::NONE
        }
    }

    /// Zero the velocity, enter `tag` and push along `impulse`.
    pub fn launch(tag: MoveStateTag, impulse: Vec3) -> Self {
        Self {
            request: Some(StateRequest::Enter(tag)),
            zero_velocity: true,
            impulse,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

/// Body changes accumulated over one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyEffects {
    pub zero_velocity: bool,
    pub impulse: Vec3,
}

/// Lay `direction` onto the plane of `normal`.
///
/// The result is not renormalized: a direction tilted into a slope loses
/// some length, as the impulse would against the surface.
pub fn project_on_ground(direction: Vec3, normal: Vec3) -> Vec3 {
    let length_squared = normal.length_squared();
    if length_squared <= f32::EPSILON {
        return direction;
    }
    direction - normal * (direction.dot(normal) / length_squared)
}

/// A one-shot timer. Negative or NaN durations finish at once.
pub(crate) fn once_timer(seconds: f32) -> Timer {
    Timer::from_seconds(seconds.max(0.0), TimerMode::Once)
}

/// Tick a timer by one fixed step.
pub(crate) fn tick_timer(timer: &mut Timer, dt: f32) {
    timer.tick(Duration::from_secs_f32(dt.max(0.0)));
}

/// The abilities a character carries. Missing ones are `None`.
#[derive(Debug, Clone, Default)]
pub struct Abilities {
    pub dash: Option<DashAbility>,
    pub climb: Option<ClimbAbility>,
    pub charge_punch: Option<ChargePunchAbility>,
    pub crouch: Option<CrouchAbility>,
}

impl Abilities {
    /// Perform `action`: transition the state machine (notifying every
    /// ability) and collect its body effects into `effects`.
    pub fn apply(
        &mut self,
        action: AbilityAction,
        controller: &mut CharacterController,
        states: &MoveStateSet,
        effects: &mut BodyEffects,
    ) {
        if let Some(request) = action.request {
            let target = *states.get(request.target());
            controller.transition(target, self);
        }
        if action.zero_velocity {
            effects.zero_velocity = true;
            // An earlier impulse this step is wiped along with the velocity.
            effects.impulse = Vec3::ZERO;
        }
        effects.impulse += action.impulse;
    }
}

impl MoveStateListener for Abilities {
    fn on_move_state_changed(&mut self, state: MoveStateTag) {
        if let Some(dash) = self.dash.as_mut() {
            dash.on_move_state_changed(state);
        }
        if let Some(climb) = self.climb.as_mut() {
            climb.on_move_state_changed(state);
        }
        if let Some(charge_punch) = self.charge_punch.as_mut() {
            charge_punch.on_move_state_changed(state);
        }
    }
}
