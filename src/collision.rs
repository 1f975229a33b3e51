//! Collision query results.
//!
//! These structures carry what the physics backend reports back to the
//! controller: per-step contact samples and downward/overhead query hits.

use bevy::prelude::*;

/// Bitmask of collider layers.
///
/// A contact or query matches a mask when the two share at least one bit.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// Matches nothing.
    pub const NONE: Self = Self(0);

    /// Mask containing a single layer index (0..32).
    pub const fn layer(index: u32) -> Self {
        Self(1 << index)
    }

    /// Check whether any bit of `layers` is part of this mask.
    #[inline]
    pub fn contains(&self, layers: u32) -> bool {
        self.0 & layers != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// One contact reported by the physics engine for the current step.
///
/// `normal` points away from the touched surface, toward the character.
/// `layers` holds the membership bits of the touched collider.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ContactSample {
    pub normal: Vec3,
    pub layers: u32,
}

impl ContactSample {
    /// Create a contact sample.
    pub fn new(normal: Vec3, layers: u32) -> Self {
        Self { normal, layers }
    }

    /// Contact against a collider that belongs to every layer.
    pub fn on_any_layer(normal: Vec3) -> Self {
        Self::new(normal, u32::MAX)
    }
}

/// Information about a raycast hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayHit {
    /// Distance to the hit point.
    pub distance: f32,
    /// Normal of the surface at hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl RayHit {
    /// Create a ray hit.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

/// Raw contacts collected for a character during the last physics step.
///
/// Filled by the backend's sensor systems and drained by the controller
/// step, so samples never survive more than one tick.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ContactBuffer {
    pub samples: Vec<ContactSample>,
}

impl ContactBuffer {
    /// Append a sample.
    pub fn push(&mut self, sample: ContactSample) {
        self.samples.push(sample);
    }

    /// Take all samples, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<ContactSample> {
        std::mem::take(&mut self.samples)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hit_new() {
        let hit = RayHit::new(0.5, Vec3::Y, Vec3::new(1.0, 0.0, 2.0), None);

        assert_eq!(hit.distance, 0.5);
        assert_eq!(hit.normal, Vec3::Y);
        assert_eq!(hit.point, Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn ray_hit_with_entity() {
        let entity = Entity::from_raw(42);
        let hit = RayHit::new(3.0, Vec3::X, Vec3::ZERO, Some(entity));

        assert_eq!(hit.entity, Some(entity));
    }

    #[test]
    fn layer_mask_matching() {
        let climbable = LayerMask::layer(3);
        assert!(climbable.contains(1 << 3));
        assert!(!climbable.contains(1 << 2));
        assert!(LayerMask::ALL.contains(1));
        assert!(!LayerMask::NONE.contains(u32::MAX));
    }

    #[test]
    fn contact_buffer_drain_empties() {
        let mut buffer = ContactBuffer::default();
        buffer.push(ContactSample::on_any_layer(Vec3::Y));
        buffer.push(ContactSample::on_any_layer(Vec3::X));

        let samples = buffer.drain();
        assert_eq!(samples.len(), 2);
        assert!(buffer.is_empty());
    }
}
