//! State marker components.
//!
//! These components indicate the current physical state of a character controller.
//! They are automatically added/removed by the controller systems at the end of
//! every fixed step, from the predicates of that step.

use bevy::prelude::*;

/// Marker component indicating the character is grounded.
///
/// This is a marker component - it has no data, just indicates state.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use fps_locomotion::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is neither grounded nor
/// climbing. Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character is touching a wall.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TouchingWall {
    /// Normal of the wall surface, pointing at the character.
    pub normal: Vec3,
}

impl TouchingWall {
    pub fn new(normal: Vec3) -> Self {
        Self { normal }
    }
}

/// Marker component indicating the character holds onto a climbable wall.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct Climbing {
    /// Normal of the climbed surface.
    pub normal: Vec3,
}

impl Climbing {
    pub fn new(normal: Vec3) -> Self {
        Self { normal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_wall_new() {
        let wall = TouchingWall::new(Vec3::X);
        assert_eq!(wall.normal, Vec3::X);
    }

    #[test]
    fn climbing_new() {
        let climbing = Climbing::new(Vec3::NEG_Z);
        assert_eq!(climbing.normal, Vec3::NEG_Z);
    }
}
