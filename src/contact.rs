//! Contact classification.
//!
//! Raw contact normals reported by the physics engine are bucketed into
//! ground, wall and climb sums once per step. The sums feed the grounded,
//! on-wall and climbing predicates of the controller.

use bevy::prelude::*;

use crate::collision::{ContactSample, LayerMask};

/// Normals pointing further down than this are ceilings, not walls.
const WALL_MIN_NORMAL_Y: f32 = -0.01;

/// Cosine thresholds used to classify contacts.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ContactThresholds {
    /// `normal.y` at or above this is ground.
    pub min_ground_dot: f32,
    /// `normal.y` at or above this may be climbed.
    pub min_climb_dot: f32,
    /// `dot(forward, -normal)` at or above this faces the wall.
    pub min_climb_facing_away_dot: f32,
    /// Layers that can be climbed.
    pub climb_mask: LayerMask,
}

/// Per-step ground/wall/climb normal sums.
///
/// A single contact keeps its raw normal; sums over several contacts are
/// normalized once all samples of the step are in.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactAccumulator {
    pub ground_normal: Vec3,
    pub ground_count: u32,
    pub wall_normal: Vec3,
    pub wall_count: u32,
    pub climb_normal: Vec3,
    pub climb_count: u32,
}

impl ContactAccumulator {
    /// Classify every sample of the step.
    ///
    /// `climb_requested` gates the climb bucket; `forward` is the facing used
    /// for the facing-away test.
    pub fn classify(
        samples: &[ContactSample],
        thresholds: &ContactThresholds,
        climb_requested: bool,
        forward: Vec3,
    ) -> Self {
        let mut acc = Self::default();
        for sample in samples {
            acc.add(sample, thresholds, climb_requested, forward);
        }
        acc.finish();
        acc
    }

    /// Add one sample to its buckets.
    pub fn add(
        &mut self,
        sample: &ContactSample,
        thresholds: &ContactThresholds,
        climb_requested: bool,
        forward: Vec3,
    ) {
        let normal = sample.normal;

        if normal.y >= thresholds.min_ground_dot {
            self.ground_count += 1;
            self.ground_normal += normal;
            return;
        }

        if normal.y > WALL_MIN_NORMAL_Y {
            self.wall_count += 1;
            self.wall_normal += normal;
        }

        // A contact can be both a wall and a climb surface.
        if climb_requested
            && normal.y >= thresholds.min_climb_dot
            && thresholds.climb_mask.contains(sample.layers)
            && facing_wall(forward, normal, thresholds.min_climb_facing_away_dot)
        {
            self.climb_count += 1;
            self.climb_normal += normal;
        }
    }

    /// Normalize the buckets that received more than one contact.
    pub fn finish(&mut self) {
        if self.ground_count > 1 {
            self.ground_normal = self.ground_normal.normalize_or_zero();
        }
        if self.wall_count > 1 {
            self.wall_normal = self.wall_normal.normalize_or_zero();
        }
        if self.climb_count > 1 {
            self.climb_normal = self.climb_normal.normalize_or_zero();
        }
    }

    /// Replace the ground bucket with a single synthesized contact.
    pub fn set_ground(&mut self, normal: Vec3) {
        self.ground_count = 1;
        self.ground_normal = normal;
    }

    /// Clear every bucket for the next step.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn has_ground(&self) -> bool {
        self.ground_count > 0
    }

    pub fn has_wall(&self) -> bool {
        self.wall_count > 0
    }

    pub fn has_climb(&self) -> bool {
        self.climb_count > 0
    }
}

/// Whether `facing` points into a surface with `normal` by at least the
/// given cosine. The boundary counts as facing.
#[inline]
pub fn facing_wall(facing: Vec3, normal: Vec3, min_cosine: f32) -> bool {
    facing.dot(-normal) >= min_cosine
}
