//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the locomotion controller. This allows easy swapping
//! between physics engines (Rapier3D, Avian, a scripted test world, etc.).

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::collision::{ContactSample, LayerMask, RayHit};

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the locomotion
/// controller. The backend handles all physics operations like raycasting,
/// contact reporting, impulses and velocity manipulation.
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`
/// which implements this trait for Bevy Rapier3D.
pub trait LocomotionPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Cast a ray and return the closest hit.
    ///
    /// # Arguments
    /// * `world` - The ECS world for queries
    /// * `origin` - Ray origin in world space
    /// * `direction` - Cast direction (should be normalized)
    /// * `max_distance` - Maximum cast distance
    /// * `exclude_entity` - Entity to exclude from cast (usually self)
    /// * `mask` - Layers the ray may hit
    fn raycast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude_entity: Entity,
        mask: LayerMask,
    ) -> Option<RayHit>;

    /// Check whether a sphere swept upward from the entity's position is
    /// blocked within `distance`.
    fn overhead_blocked(
        world: &World,
        entity: Entity,
        radius: f32,
        distance: f32,
        mask: LayerMask,
    ) -> bool;

    /// Get the current velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Apply an impulse to an entity.
    ///
    /// Impulse is an instantaneous change in momentum (velocity).
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3);

    /// Get the gravity vector for an entity.
    fn get_gravity(world: &World, entity: Entity) -> Vec3;

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Scale the collider's vertical extent (1.0 = standing).
    fn set_height_scale(world: &mut World, entity: Entity, scale: f32);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }

    /// Collect the contacts of the last physics step.
    ///
    /// Appended to the character's
    /// [`ContactBuffer`](crate::collision::ContactBuffer) in
    /// [`LocomotionSet::Sensors`](crate::LocomotionSet::Sensors). Backends
    /// that fill the buffer some other way can keep the default.
    fn collect_contacts(_world: &World, _entity: Entity) -> Vec<ContactSample> {
        Vec::new()
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// Read-only physics queries the solver and abilities issue for one character.
pub trait PhysicsQueries {
    /// Cast a ray from the character's position.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask)
        -> Option<RayHit>;

    /// Check whether standing up is blocked by geometry overhead.
    fn overhead_blocked(&self, radius: f32, distance: f32, mask: LayerMask) -> bool;
}

/// [`PhysicsQueries`] answered by a backend for a single entity.
pub struct BackendQueries<'w, B: LocomotionPhysicsBackend> {
    world: &'w World,
    entity: Entity,
    _marker: PhantomData<B>,
}

impl<'w, B: LocomotionPhysicsBackend> BackendQueries<'w, B> {
    pub fn new(world: &'w World, entity: Entity) -> Self {
        Self {
            world,
            entity,
            _marker: PhantomData,
        }
    }
}

impl<B: LocomotionPhysicsBackend> PhysicsQueries for BackendQueries<'_, B> {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        B::raycast(self.world, origin, direction, max_distance, self.entity, mask)
    }

    fn overhead_blocked(&self, radius: f32, distance: f32, mask: LayerMask) -> bool {
        B::overhead_blocked(self.world, self.entity, radius, distance, mask)
    }
}

/// Queries against an empty world: nothing is ever hit.
pub struct EmptyQueries;

impl PhysicsQueries for EmptyQueries {
    fn raycast(&self, _: Vec3, _: Vec3, _: f32, _: LayerMask) -> Option<RayHit> {
        None
    }

    fn overhead_blocked(&self, _: f32, _: f32, _: LayerMask) -> bool {
        false
    }
}
