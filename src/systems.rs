//! Core controller systems.
//!
//! These systems feed [`step_character`] from the physics backend and write
//! its results back. They are generic over the physics backend to allow
//! different physics engines to be used.

use bevy::prelude::*;

use crate::abilities::{
    Abilities, ChargePunchAbility, ClimbAbility, CrouchAbility, DashAbility,
};
use crate::backend::{BackendQueries, LocomotionPhysicsBackend};
use crate::collision::ContactBuffer;
use crate::config::{CharacterOrientation, ControllerConfig};
use crate::controller::CharacterController;
use crate::error::ConfigError;
use crate::intent::LocomotionIntent;
use crate::move_state::MoveStateSet;
use crate::solver::SolverInput;
use crate::state::{Airborne, Climbing, Grounded, TouchingWall};
use crate::step::{step_character, StepContext};
use crate::{Jumped, MoveStateChanged};

/// Append the contacts reported by the backend to each character's buffer.
pub fn collect_contacts<B: LocomotionPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (With<CharacterController>, With<ContactBuffer>)>()
        .iter(world)
        .collect();

    for entity in entities {
        let samples = B::collect_contacts(world, entity);
        if samples.is_empty() {
            continue;
        }
        if let Some(mut buffer) = world.get_mut::<ContactBuffer>(entity) {
            buffer.samples.extend(samples);
        }
    }
}

/// Per-character snapshot taken before stepping.
struct Snapshot {
    entity: Entity,
    controller: CharacterController,
    config: ControllerConfig,
    states: MoveStateSet,
    orientation: CharacterOrientation,
    abilities: Abilities,
}

/// Run one locomotion step for every character.
///
/// Components are cloned out, stepped without touching the world, then
/// written back together with the body velocity, impulse and height.
pub fn step_controllers<B: LocomotionPhysicsBackend>(world: &mut World) {
    let snapshots: Vec<Snapshot> = world
        .query::<(
            Entity,
            &CharacterController,
            &ControllerConfig,
            Option<&MoveStateSet>,
            Option<&CharacterOrientation>,
            Option<&DashAbility>,
            Option<&ClimbAbility>,
            Option<&ChargePunchAbility>,
            Option<&CrouchAbility>,
        )>()
        .iter(world)
        .map(
            |(entity, controller, config, states, orientation, dash, climb, charge, crouch)| {
                Snapshot {
                    entity,
                    controller: controller.clone(),
                    config: *config,
                    states: states.copied().unwrap_or_default(),
                    orientation: orientation.copied().unwrap_or_default(),
                    abilities: Abilities {
                        dash: dash.cloned(),
                        climb: climb.cloned(),
                        charge_punch: charge.cloned(),
                        crouch: crouch.copied(),
                    },
                }
            },
        )
        .collect();

    let dt = B::get_fixed_timestep(world);

    for snapshot in snapshots {
        let Snapshot {
            entity,
            mut controller,
            config,
            states,
            orientation,
            mut abilities,
        } = snapshot;

        let commands = world
            .get_mut::<LocomotionIntent>(entity)
            .map(|mut intent| intent.drain())
            .unwrap_or_default();
        let samples = world
            .get_mut::<ContactBuffer>(entity)
            .map(|mut buffer| buffer.drain())
            .unwrap_or_default();

        let input = SolverInput {
            velocity: B::get_velocity(world, entity),
            position: B::get_position(world, entity),
            gravity: B::get_gravity(world, entity),
            dt,
        };

        let frame = {
            let queries = BackendQueries::<B>::new(world, entity);
            let context = StepContext {
                config: &config,
                states: &states,
                orientation: &orientation,
                queries: &queries,
            };
            step_character(
                &mut controller,
                &mut abilities,
                context,
                &commands,
                &samples,
                input,
            )
        };

        if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
            entity_mut.insert(controller);
            if let Some(dash) = abilities.dash {
                entity_mut.insert(dash);
            }
            if let Some(climb) = abilities.climb {
                entity_mut.insert(climb);
            }
            if let Some(charge_punch) = abilities.charge_punch {
                entity_mut.insert(charge_punch);
            }
        } else {
            continue;
        }

        B::set_velocity(world, entity, frame.velocity);
        if frame.impulse != Vec3::ZERO {
            B::apply_impulse(world, entity, frame.impulse);
        }
        if let Some(scale) = frame.height_scale {
            B::set_height_scale(world, entity, scale);
        }

        if let Some(jump) = frame.jump {
            trace!("{entity}: {:?} jump", jump.kind);
            world.send_event(Jumped {
                entity,
                kind: jump.kind,
            });
        }
        if let Some((from, to)) = frame.state_change {
            debug!("{entity}: move state {from:?} -> {to:?}");
            world.send_event(MoveStateChanged { entity, from, to });
        }
    }
}

/// Synchronize state marker components with the last step's predicates.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &CharacterController,
        Has<Grounded>,
        Has<Airborne>,
        Option<&TouchingWall>,
        Option<&Climbing>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne, wall, climbing) in &q_controllers {
        let status = controller.status();

        // Sync Grounded/Airborne
        if status.on_ground && !has_grounded {
            commands.entity(entity).insert(Grounded);
        } else if !status.on_ground && has_grounded {
            commands.entity(entity).remove::<Grounded>();
        }

        let airborne = !status.on_ground && !status.climbing;
        if airborne && !has_airborne {
            commands.entity(entity).insert(Airborne);
        } else if !airborne && has_airborne {
            commands.entity(entity).remove::<Airborne>();
        }

        // Marker data follows the normal, so only touch it on change.
        match (status.on_wall, wall) {
            (true, Some(wall)) if wall.normal == status.wall_normal => {}
            (true, _) => {
                commands
                    .entity(entity)
                    .insert(TouchingWall::new(status.wall_normal));
            }
            (false, Some(_)) => {
                commands.entity(entity).remove::<TouchingWall>();
            }
            (false, None) => {}
        }

        match (status.climbing, climbing) {
            (true, Some(climbing)) if climbing.normal == status.climb_normal => {}
            (true, _) => {
                commands
                    .entity(entity)
                    .insert(Climbing::new(status.climb_normal));
            }
            (false, Some(_)) => {
                commands.entity(entity).remove::<Climbing>();
            }
            (false, None) => {}
        }
    }
}

/// Check every piece of configuration a character carries.
fn validate_character(
    config: Option<&ControllerConfig>,
    states: Option<&MoveStateSet>,
    dash: Option<&DashAbility>,
    charge_punch: Option<&ChargePunchAbility>,
    crouch: Option<&CrouchAbility>,
) -> Result<(), ConfigError> {
    if let Some(config) = config {
        config.validate()?;
    }
    if let Some(states) = states {
        states.validate()?;
    }
    if let Some(dash) = dash {
        dash.validate()?;
    }
    if let Some(charge_punch) = charge_punch {
        charge_punch.validate()?;
    }
    if let Some(crouch) = crouch {
        crouch.validate()?;
    }
    Ok(())
}

/// Validate newly added controllers.
///
/// A character with invalid configuration loses its [`CharacterController`]
/// and is left alone by the locomotion systems. Valid ones are bound to the
/// default record of their [`MoveStateSet`].
pub fn validate_new_controllers(
    mut commands: Commands,
    mut q_controllers: Query<
        (
            Entity,
            &mut CharacterController,
            Option<&ControllerConfig>,
            Option<&MoveStateSet>,
            Option<&DashAbility>,
            Option<&ChargePunchAbility>,
            Option<&CrouchAbility>,
        ),
        Added<CharacterController>,
    >,
) {
    for (entity, mut controller, config, states, dash, charge_punch, crouch) in &mut q_controllers
    {
        if let Err(err) = validate_character(config, states, dash, charge_punch, crouch) {
            error!("{entity}: disabling character controller: {err}");
            commands.entity(entity).remove::<CharacterController>();
            continue;
        }
        if config.is_none() {
            warn!("{entity}: character controller without ControllerConfig is never stepped");
        }

        let states = states.copied().unwrap_or_default();
        if *controller.current_record() != states.default {
            controller.bind_states(&states);
        }
    }
}

/// Validate abilities added to a character after its controller.
///
/// An invalid ability is removed; the controller keeps running without it.
/// Abilities spawned together with the controller are left to
/// [`validate_new_controllers`].
pub fn validate_new_abilities(
    mut commands: Commands,
    q_abilities: Query<
        (
            Entity,
            Ref<CharacterController>,
            Option<Ref<DashAbility>>,
            Option<Ref<ChargePunchAbility>>,
            Option<Ref<CrouchAbility>>,
        ),
        Or<(
            Added<DashAbility>,
            Added<ChargePunchAbility>,
            Added<CrouchAbility>,
        )>,
    >,
) {
    for (entity, controller, dash, charge_punch, crouch) in &q_abilities {
        if controller.is_added() {
            continue;
        }
        if let Some(dash) = dash.filter(|dash| dash.is_added()) {
            if let Err(err) = dash.validate() {
                error!("{entity}: removing dash ability: {err}");
                commands.entity(entity).remove::<DashAbility>();
            }
        }
        if let Some(charge_punch) = charge_punch.filter(|charge_punch| charge_punch.is_added()) {
            if let Err(err) = charge_punch.validate() {
                error!("{entity}: removing charge-punch ability: {err}");
                commands.entity(entity).remove::<ChargePunchAbility>();
            }
        }
        if let Some(crouch) = crouch.filter(|crouch| crouch.is_added()) {
            if let Err(err) = crouch.validate() {
                error!("{entity}: removing crouch ability: {err}");
                commands.entity(entity).remove::<CrouchAbility>();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_accepts_defaults() {
        let config = ControllerConfig::player();
        let states = MoveStateSet::default();
        let dash = DashAbility::default();
        let charge = ChargePunchAbility::default();
        let crouch = CrouchAbility::default();
        assert!(validate_character(
            Some(&config),
            Some(&states),
            Some(&dash),
            Some(&charge),
            Some(&crouch)
        )
        .is_ok());
    }

    #[test]
    fn validation_rejects_bad_ability() {
        let mut dash = DashAbility::default();
        dash.dash_duration = 0.0;
        assert!(validate_character(None, None, Some(&dash), None, None).is_err());
    }

    #[test]
    fn validation_rejects_bad_angle() {
        let config = ControllerConfig {
            max_ground_angle: 200.0,
            ..default()
        };
        assert!(validate_character(Some(&config), None, None, None, None).is_err());
    }
}
