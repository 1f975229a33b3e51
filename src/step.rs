//! One fixed step of a character, from intent to body velocity.
//!
//! The order is fixed:
//!
//! 1. movement commands (input direction, jump, climb)
//! 2. contact classification
//! 3. dash and charge-punch timers
//! 4. ability commands (dash, crouch, charge)
//! 5. climb re-evaluation, queued uncrouch
//! 6. velocity solver
//!
//! Timers tick before the commands, so a dash or punch started this step
//! spends its whole duration in its state.
//!
//! Nothing here touches the ECS world; [`crate::systems`] feeds it from the
//! physics backend and writes the [`StepFrame`] back.

use bevy::prelude::*;

use crate::abilities::{Abilities, AbilityAction, BodyEffects};
use crate::backend::PhysicsQueries;
use crate::collision::ContactSample;
use crate::config::{CharacterOrientation, ControllerConfig};
use crate::contact::ContactAccumulator;
use crate::controller::CharacterController;
use crate::intent::ControlCommand;
use crate::jump::Jump;
use crate::move_state::{MoveStateSet, MoveStateTag};
use crate::solver::{solve, SolverInput};

/// Everything a character's body must be told after one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepFrame {
    /// Velocity to write to the body.
    pub velocity: Vec3,
    /// Impulse to apply after the velocity write.
    pub impulse: Vec3,
    /// New collider height scale, when crouching changed.
    pub height_scale: Option<f32>,
    /// Jump honored this step.
    pub jump: Option<Jump>,
    /// Move state before and after the step, when it changed.
    pub state_change: Option<(MoveStateTag, MoveStateTag)>,
}

/// Borrowed configuration of one character.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a ControllerConfig,
    pub states: &'a MoveStateSet,
    pub orientation: &'a CharacterOrientation,
    pub queries: &'a dyn PhysicsQueries,
}

/// Run one fixed step.
pub fn step_character(
    controller: &mut CharacterController,
    abilities: &mut Abilities,
    context: StepContext<'_>,
    commands: &[ControlCommand],
    samples: &[ContactSample],
    input: SolverInput,
) -> StepFrame {
    let StepContext {
        config,
        states,
        orientation,
        queries,
    } = context;
    let state_before = controller.move_state();
    let mut effects = BodyEffects::default();
    let mut height_scale = None;

    // 1. Movement commands
    for command in commands {
        match *command {
            ControlCommand::SetInputDirection(direction) => {
                controller.set_input_direction(direction)
            }
            ControlCommand::TryJump => controller.try_jump(),
            ControlCommand::Climb(held) => controller.climb(held),
            ControlCommand::PreventSnappingToGround => controller.prevent_snapping_to_ground(),
            _ => {}
        }
    }

    // 2. Contacts
    controller.jump_grace_steps = config.jump_grace_steps;
    controller.contacts = ContactAccumulator::classify(
        samples,
        &config.contact_thresholds(),
        controller.climb_requested,
        orientation.forward(),
    );
    controller.ground_normal = if controller.step_on_ground() {
        controller.contacts.ground_normal
    } else {
        Vec3::Y
    };

    // 3. Ability timers
    if let Some(dash) = abilities.dash.as_mut() {
        let action = dash.tick(input.dt);
        abilities.apply(action, controller, states, &mut effects);
    }
    if let Some(charge_punch) = abilities.charge_punch.as_mut() {
        let action = charge_punch.tick(input.dt, controller, orientation);
        abilities.apply(action, controller, states, &mut effects);
    }

    // 4. Ability commands
    for command in commands {
        let action = match *command {
            ControlCommand::Dash(direction) => match abilities.dash.as_mut() {
                Some(dash) => dash.dash(direction, controller, orientation),
                None => AbilityAction::NONE,
            },
            ControlCommand::StartCharge => match abilities.charge_punch.as_mut() {
                Some(charge_punch) => charge_punch.start_charge(),
                None => AbilityAction::NONE,
            },
            ControlCommand::EndCharge { canceled } => match abilities.charge_punch.as_mut() {
                Some(charge_punch) => charge_punch.end_charge(canceled, controller, orientation),
                None => AbilityAction::NONE,
            },
            ControlCommand::Crouch => {
                if let Some(crouch) = abilities.crouch {
                    height_scale = crouch.crouch(controller).or(height_scale);
                }
                AbilityAction::NONE
            }
            ControlCommand::Uncrouch => {
                if let Some(crouch) = abilities.crouch {
                    crouch.uncrouch(controller);
                }
                AbilityAction::NONE
            }
            _ => AbilityAction::NONE,
        };
        abilities.apply(action, controller, states, &mut effects);
    }

    // 5. Climb and crouch
    if let Some(climb) = abilities.climb.as_mut() {
        let action = climb.tick(controller);
        abilities.apply(action, controller, states, &mut effects);
    }
    if let Some(crouch) = abilities.crouch {
        height_scale = crouch.tick(controller, queries).or(height_scale);
    }

    // 6. Solver
    let velocity = if effects.zero_velocity {
        Vec3::ZERO
    } else {
        input.velocity
    };
    let output = solve(
        controller,
        config,
        orientation,
        queries,
        SolverInput { velocity, ..input },
    );

    let jump_impulse = output.jump.map_or(Vec3::ZERO, |jump| jump.impulse);
    let state_after = controller.move_state();

    StepFrame {
        velocity: output.velocity,
        impulse: effects.impulse + jump_impulse,
        height_scale,
        jump: output.jump,
        state_change: (state_before != state_after).then_some((state_before, state_after)),
    }
}
