//! Momentum-preserving speed transitions.
//!
//! Leaving a fast state (a dash, a punch) does not drop the effective move
//! speed at once. Instead the speed glides linearly down to the new state's
//! target, decaying at the leaving state's deceleration.

use bevy::prelude::*;

use crate::move_state::MoveStateRecord;

/// A glide in flight.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct Glide {
    /// Speed the glide settles on.
    pub target: f32,
    /// Decay rate while grounded, taken from the momentum-carrying record.
    pub ground_decel: f32,
    /// Decay rate while airborne, taken from the momentum-carrying record.
    pub air_decel: f32,
    /// Vertical speed ceiling carried over from the momentum-carrying record.
    pub y_ceiling: f32,
}

impl Glide {
    fn decel(&self, grounded: bool) -> f32 {
        if grounded {
            self.ground_decel
        } else {
            self.air_decel
        }
    }
}

/// Drives the effective move speed toward a target over several ticks.
///
/// Only the latest glide moves the speed. Glides it superseded stay counted
/// in `depth` until they retire, one per tick, and the latest glide only
/// lands once it is the last one in flight.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct MomentumScheduler {
    glide: Option<Glide>,
    /// Glides in flight, superseded ones included.
    depth: u32,
}

impl MomentumScheduler {
    /// Whether a transition from `from` to `to` keeps the current speed.
    pub fn eligible(from: &MoveStateRecord, to: &MoveStateRecord, move_speed: f32) -> bool {
        from.has_momentum && to.accepts_momentum && move_speed > to.speed
    }

    /// Start gliding toward `target`, superseding any glide in flight.
    pub fn start(&mut self, target: f32, source: &MoveStateRecord) {
        self.glide = Some(Glide {
            target,
            ground_decel: source.ground_decel,
            air_decel: source.air_decel,
            y_ceiling: source.y_speed,
        });
        self.depth = self.depth.saturating_add(1);
    }

    /// Drop the glide in flight without touching the speed.
    pub fn cancel(&mut self) {
        self.glide = None;
        self.depth = 0;
    }

    /// Advance the glide by one step.
    ///
    /// `move_speed` decays by `decel * dt`. Reaching the target while no
    /// superseded glide is left snaps it exactly and retires the glide.
    pub fn tick(&mut self, move_speed: &mut f32, grounded: bool, dt: f32) {
        let Some(glide) = self.glide else {
            return;
        };
        if self.depth > 1 {
            self.depth -= 1;
        }

        let step = glide.decel(grounded) * dt;
        let diff = glide.target - *move_speed;
        if diff.abs() > step {
            *move_speed += step.copysign(diff);
        } else if self.depth <= 1 {
            *move_speed = glide.target;
            self.glide = None;
            self.depth = 0;
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.glide.is_some()
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Vertical ceiling of the glide in flight.
    pub fn y_ceiling(&self) -> Option<f32> {
        self.glide.map(|glide| glide.y_ceiling)
    }

    pub fn glide(&self) -> Option<&Glide> {
        self.glide.as_ref()
    }
}
