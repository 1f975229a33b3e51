//! # `fps_locomotion`
//!
//! A physics-driven first-person rigidbody locomotion core with physics
//! backend abstraction.
//!
//! This crate provides a responsive, tuneable first-person controller that:
//! - Classifies contacts into ground, wall and climbable surfaces
//! - Steers velocity per axis within a state-dependent speed limit
//! - Glides the speed limit down after momentum-carrying moves (dash, punch)
//! - Buffers jumps, including wall jumps that need a fresh wall
//! - Snaps to the ground over crests and small steps
//! - Ships dash, climb, charge-punch and crouch abilities
//! - Abstracts physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! The controller drives a **dynamic rigidbody**:
//! 1. The physics engine resolves collisions and reports contacts
//! 2. Every fixed step the contacts are classified and the move state updated
//! 3. A velocity solver writes the new body velocity
//! 4. Jumps and abilities push the body with impulses
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use fps_locomotion::prelude::*;
//!
//! // Create controller components for a player
//! let bundle = LocomotionBundle::try_new(ControllerConfig::player(), MoveStateSet::default())
//!     .expect("default configuration is valid");
//! assert_eq!(bundle.controller.move_state(), MoveStateTag::Default);
//!
//! // These can be spawned together with physics components
//! ```

use bevy::prelude::*;

pub mod abilities;
pub mod backend;
pub mod collision;
pub mod config;
pub mod contact;
pub mod controller;
pub mod error;
pub mod intent;
pub mod jump;
pub mod momentum;
pub mod move_state;
pub mod snap;
pub mod solver;
pub mod state;
pub mod step;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::abilities::{ChargePunchAbility, ClimbAbility, CrouchAbility, DashAbility};
    pub use crate::backend::LocomotionPhysicsBackend;
    pub use crate::collision::{ContactBuffer, ContactSample, LayerMask, RayHit};
    pub use crate::config::{CharacterOrientation, ControllerConfig};
    pub use crate::controller::CharacterController;
    pub use crate::error::ConfigError;
    pub use crate::intent::{ControlCommand, LocomotionIntent};
    pub use crate::jump::JumpKind;
    pub use crate::move_state::{MoveStateRecord, MoveStateSet, MoveStateTag};
    pub use crate::state::{Airborne, Climbing, Grounded, TouchingWall};
    pub use crate::{Jumped, LocomotionBundle, LocomotionPlugin, LocomotionSet, MoveStateChanged};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

use collision::ContactBuffer;
use config::{CharacterOrientation, ControllerConfig};
use controller::CharacterController;
use error::ConfigError;
use intent::LocomotionIntent;
use jump::JumpKind;
use move_state::{MoveStateSet, MoveStateTag};

/// System sets for the locomotion pipeline.
///
/// All sets run in `FixedUpdate`, chained in declaration order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Configuration checks for newly added controllers and abilities.
    Validation,
    /// Backend sensors fill each character's [`ContactBuffer`].
    Sensors,
    /// One locomotion step per character.
    Step,
    /// State marker components follow the step.
    Sync,
}

/// Sent when a character's move state changes during a step.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MoveStateChanged {
    pub entity: Entity,
    pub from: MoveStateTag,
    pub to: MoveStateTag,
}

/// Sent when a character jumps off the ground or a wall.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct Jumped {
    pub entity: Entity,
    pub kind: JumpKind,
}

/// Main plugin for the locomotion controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (contacts, raycasting, impulses, etc.).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use fps_locomotion::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(LocomotionPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct LocomotionPlugin<B: backend::LocomotionPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::LocomotionPhysicsBackend> Default for LocomotionPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::LocomotionPhysicsBackend> Plugin for LocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<CharacterController>();
        app.register_type::<CharacterOrientation>();
        app.register_type::<ControllerConfig>();
        app.register_type::<MoveStateSet>();
        app.register_type::<LocomotionIntent>();
        app.register_type::<ContactBuffer>();
        app.register_type::<abilities::DashAbility>();
        app.register_type::<abilities::ClimbAbility>();
        app.register_type::<abilities::ChargePunchAbility>();
        app.register_type::<abilities::CrouchAbility>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::TouchingWall>();
        app.register_type::<state::Climbing>();

        app.add_event::<MoveStateChanged>();
        app.add_event::<Jumped>();

        app.configure_sets(
            FixedUpdate,
            (
                LocomotionSet::Validation,
                LocomotionSet::Sensors,
                LocomotionSet::Step,
                LocomotionSet::Sync,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                (
                    systems::validate_new_controllers,
                    systems::validate_new_abilities,
                )
                    .in_set(LocomotionSet::Validation),
                systems::collect_contacts::<B>.in_set(LocomotionSet::Sensors),
                systems::step_controllers::<B>.in_set(LocomotionSet::Step),
                systems::sync_state_markers.in_set(LocomotionSet::Sync),
            ),
        );
    }
}

/// The components every locomotion character needs.
///
/// Abilities are added separately, as plain components, so a character
/// only carries the ones it uses.
#[derive(Bundle, Clone)]
pub struct LocomotionBundle {
    pub controller: CharacterController,
    pub config: ControllerConfig,
    pub states: MoveStateSet,
    pub orientation: CharacterOrientation,
    pub intent: LocomotionIntent,
    pub contacts: ContactBuffer,
}

impl LocomotionBundle {
    /// Build a bundle after checking the configuration.
    pub fn try_new(config: ControllerConfig, states: MoveStateSet) -> Result<Self, ConfigError> {
        config.validate()?;
        states.validate()?;
        Ok(Self {
            controller: CharacterController::new(&states),
            config,
            states,
            orientation: CharacterOrientation::default(),
            intent: LocomotionIntent::default(),
            contacts: ContactBuffer::default(),
        })
    }

    /// Builder: set the initial facing.
    pub fn with_orientation(mut self, orientation: CharacterOrientation) -> Self {
        self.orientation = orientation;
        self
    }
}
