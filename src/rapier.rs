//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature (on by default).
//!
//! Contacts, the snap probe and the overhead clearance cast are gathered by
//! dedicated Rapier systems that receive `RapierContext` as a system
//! parameter. They run in [`LocomotionSet::Sensors`] and cache their results
//! in [`RapierSensors`], which the backend answers queries from.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::abilities::CrouchAbility;
use crate::backend::LocomotionPhysicsBackend;
use crate::collision::{ContactBuffer, ContactSample, LayerMask, RayHit};
use crate::config::ControllerConfig;
use crate::controller::CharacterController;
use crate::LocomotionSet;

/// Gravity used when no Rapier context reports one.
const FALLBACK_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Rapier3D physics backend for the locomotion controller.
///
/// This backend uses `bevy_rapier3d` for velocity and impulse writes.
/// Collision queries are answered from [`RapierSensors`], which the Rapier
/// sensor systems refresh every fixed step.
pub struct Rapier3dBackend;

impl LocomotionPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn raycast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude_entity: Entity,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let sensors = world.get::<RapierSensors>(exclude_entity)?;
        let probe = sensors.ground_probe.as_ref()?;
        // Only the downward snap probe is cast ahead of time.
        if probe.mask != mask || direction.dot(Vec3::NEG_Y) < 0.999 {
            trace!("{exclude_entity}: uncached ray query ignored");
            return None;
        }
        let offset = origin - probe.origin;
        probe
            .hit
            .filter(|hit| hit.distance + offset.y <= max_distance)
    }

    fn overhead_blocked(
        world: &World,
        entity: Entity,
        _radius: f32,
        _distance: f32,
        _mask: LayerMask,
    ) -> bool {
        world
            .get::<RapierSensors>(entity)
            .is_some_and(|sensors| sensors.overhead_blocked)
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
        } else if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            // Fallback: apply as velocity change if no ExternalImpulse component
            vel.linvel += impulse;
        }
    }

    fn get_gravity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<RapierSensors>(entity)
            .map(|sensors| sensors.gravity)
            .unwrap_or(FALLBACK_GRAVITY)
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation())
            })
            .unwrap_or(Vec3::ZERO)
    }

    fn set_height_scale(world: &mut World, entity: Entity, scale: f32) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.scale.y = scale;
        }
    }
}

/// Plugin that sets up Rapier3D-specific systems for the locomotion controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<RapierSensors>();

        app.add_systems(
            FixedUpdate,
            (
                insert_rapier_sensors,
                (rapier_collect_contacts, rapier_probe_surroundings),
            )
                .chain()
                .in_set(LocomotionSet::Sensors),
        );
    }
}

/// A cached downward probe.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct GroundProbe {
    pub origin: Vec3,
    pub mask: LayerMask,
    #[reflect(ignore)]
    pub hit: Option<RayHit>,
}

/// Rapier query results for one character, refreshed every fixed step.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct RapierSensors {
    pub ground_probe: Option<GroundProbe>,
    pub overhead_blocked: bool,
    pub gravity: Vec3,
}

impl Default for RapierSensors {
    fn default() -> Self {
        Self {
            ground_probe: None,
            overhead_blocked: false,
            gravity: FALLBACK_GRAVITY,
        }
    }
}

fn insert_rapier_sensors(
    mut commands: Commands,
    q_new: Query<Entity, (With<CharacterController>, Without<RapierSensors>)>,
) {
    for entity in &q_new {
        commands.entity(entity).insert(RapierSensors::default());
    }
}

/// Distance from collider center to its top (or bottom) along Y.
pub fn collider_half_height(collider: &Collider) -> f32 {
    if let Some(capsule) = collider.as_capsule() {
        let segment = capsule.segment();
        let half_height = (segment.a().y - segment.b().y).abs() / 2.0;
        half_height + capsule.radius()
    } else if let Some(ball) = collider.as_ball() {
        ball.radius()
    } else if let Some(cuboid) = collider.as_cuboid() {
        cuboid.half_extents().y
    } else if let Some(cylinder) = collider.as_cylinder() {
        cylinder.half_height()
    } else {
        0.0
    }
}

/// Query filter that skips the character itself and sensors.
fn layer_filter(entity: Entity, mask: LayerMask) -> QueryFilter<'static> {
    QueryFilter::default()
        .exclude_rigid_body(entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(mask.0),
        ))
}

/// Copy the contact manifolds touching each character into its
/// [`ContactBuffer`], one sample per contact point.
fn rapier_collect_contacts(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(Entity, &mut ContactBuffer), With<CharacterController>>,
    q_groups: Query<&CollisionGroups>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, mut buffer) in &mut q_controllers {
        for pair in context.contact_pairs_with(entity) {
            if !pair.has_any_active_contact() {
                continue;
            }
            let self_is_first = pair.collider1() == Some(entity);
            let other = if self_is_first {
                pair.collider2()
            } else {
                pair.collider1()
            };
            let layers = other
                .and_then(|other| q_groups.get(other).ok())
                .map(|groups| groups.memberships.bits())
                .unwrap_or(u32::MAX);

            for manifold in pair.manifolds() {
                // Manifold normals point from the first collider to the second.
                let normal = if self_is_first {
                    -manifold.normal()
                } else {
                    manifold.normal()
                };
                let normal = normal.normalize_or_zero();
                if normal == Vec3::ZERO {
                    continue;
                }
                for _ in 0..manifold.num_points() {
                    buffer.push(ContactSample::new(normal, layers));
                }
            }
        }
    }
}

/// Cast the snap probe and the overhead clearance probe, and record gravity.
fn rapier_probe_surroundings(
    rapier_context: ReadRapierContext,
    q_configuration: Query<&RapierConfiguration>,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &ControllerConfig,
        &CharacterController,
        Option<&CrouchAbility>,
        Option<&Collider>,
        &mut RapierSensors,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let gravity = q_configuration
        .iter()
        .next()
        .map(|configuration| configuration.gravity)
        .unwrap_or(FALLBACK_GRAVITY);

    for (entity, transform, config, controller, crouch, collider, mut sensors) in
        &mut q_controllers
    {
        let position = transform.translation();
        sensors.gravity = gravity;

        let hit = context
            .cast_ray_and_get_normal(
                position,
                Vec3::NEG_Y,
                config.snap_probe_distance,
                true,
                layer_filter(entity, config.snap_probe_mask),
            )
            .map(|(hit_entity, intersection)| {
                RayHit::new(
                    intersection.time_of_impact,
                    intersection.normal,
                    intersection.point,
                    Some(hit_entity),
                )
            });
        sensors.ground_probe = Some(GroundProbe {
            origin: position,
            mask: config.snap_probe_mask,
            hit,
        });

        sensors.overhead_blocked = match crouch {
            Some(crouch) if controller.crouching => {
                let scale = transform.compute_transform().scale.y.max(f32::EPSILON);
                let top = collider.map(collider_half_height).unwrap_or(0.0) * scale;
                let shape = Collider::ball(crouch.probe_radius);
                let distance = (top - crouch.probe_radius).max(0.0) + crouch.clearance_distance;
                context
                    .cast_shape(
                        position,
                        Quat::IDENTITY,
                        Vec3::Y,
                        &shape,
                        ShapeCastOptions {
                            max_time_of_impact: distance,
                            stop_at_penetration: true,
                            ..default()
                        },
                        layer_filter(entity, crouch.clearance_mask),
                    )
                    .is_some()
            }
            _ => false,
        };
    }
}

/// Bundle for creating a character with Rapier3D physics.
///
/// The controller integrates gravity itself, so Rapier's gravity is
/// disabled on the body. Friction is zeroed with the `Min` combine rule so
/// walls never hold the character up; drag is handled by the controller.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use fps_locomotion::prelude::*;
/// use fps_locomotion::rapier::Rapier3dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         LocomotionBundle::try_new(ControllerConfig::player(), MoveStateSet::default())
///             .expect("valid config"),
///         Rapier3dCharacterBundle::new(),
///         Collider::capsule_y(0.5, 0.4),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    /// Used for jump, dash and punch impulses.
    pub external_impulse: ExternalImpulse,
    pub locked_axes: LockedAxes,
    pub gravity_scale: GravityScale,
    pub friction: Friction,
    pub mass_properties: ReadMassProperties,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    /// A dynamic, upright body without Rapier gravity or friction.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_impulse: ExternalImpulse::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(0.0),
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Set the rigid body type for the character.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}
