//! Locomotion intent component.
//!
//! Intents carry already-debounced player (or AI) input to the controller.
//! Your code decides *when* the player jumps, dashes or crouches; the
//! controller decides what that does to the body on the next fixed step.

use bevy::prelude::*;

/// A single control call, applied in order on the next fixed step.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Local move input: `x` = strafe, `y` = forward. Clamped to unit length.
    SetInputDirection(Vec2),
    TryJump,
    /// Whether climbing is held.
    Climb(bool),
    /// Dash along a local direction; zero dashes forward.
    Dash(Vec2),
    Crouch,
    Uncrouch,
    StartCharge,
    EndCharge { canceled: bool },
    /// Ignore the ground for the jump grace window without jumping.
    PreventSnappingToGround,
}

/// Queue of control calls for a character.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use fps_locomotion::prelude::*;
///
/// let mut intent = LocomotionIntent::default();
/// intent.set_input_direction(Vec2::Y);
/// intent.try_jump();
/// assert_eq!(intent.pending().len(), 2);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct LocomotionIntent {
    commands: Vec<ControlCommand>,
}

impl LocomotionIntent {
    /// Set the move direction (`x` = strafe right, `y` = forward).
    pub fn set_input_direction(&mut self, direction: Vec2) {
        self.commands.push(ControlCommand::SetInputDirection(direction));
    }

    /// Request a jump. Stays buffered for a few steps if it can't be honored
    /// right away.
    pub fn try_jump(&mut self) {
        self.commands.push(ControlCommand::TryJump);
    }

    /// Set whether climbing is held.
    pub fn climb(&mut self, held: bool) {
        self.commands.push(ControlCommand::Climb(held));
    }

    /// Dash along a local direction. No-op while on cooldown.
    pub fn dash(&mut self, direction: Vec2) {
        self.commands.push(ControlCommand::Dash(direction));
    }

    pub fn crouch(&mut self) {
        self.commands.push(ControlCommand::Crouch);
    }

    /// Stand up once there is room overhead.
    pub fn uncrouch(&mut self) {
        self.commands.push(ControlCommand::Uncrouch);
    }

    /// Start charging a punch. No-op while on cooldown.
    pub fn start_charge(&mut self) {
        self.commands.push(ControlCommand::StartCharge);
    }

    /// Release a charge. A full, uncanceled charge punches.
    pub fn end_charge(&mut self, canceled: bool) {
        self.commands.push(ControlCommand::EndCharge { canceled });
    }

    pub fn prevent_snapping_to_ground(&mut self) {
        self.commands.push(ControlCommand::PreventSnappingToGround);
    }

    /// Commands waiting for the next step.
    pub fn pending(&self) -> &[ControlCommand] {
        &self.commands
    }

    /// Take every pending command.
    pub fn drain(&mut self) -> Vec<ControlCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_keep_call_order() {
        let mut intent = LocomotionIntent::default();
        intent.start_charge();
        intent.dash(Vec2::X);
        intent.end_charge(true);

        assert_eq!(
            intent.pending(),
            &[
                ControlCommand::StartCharge,
                ControlCommand::Dash(Vec2::X),
                ControlCommand::EndCharge { canceled: true },
            ]
        );
    }

    #[test]
    fn drain_empties_queue() {
        let mut intent = LocomotionIntent::default();
        intent.try_jump();
        intent.climb(true);

        let commands = intent.drain();
        assert_eq!(commands.len(), 2);
        assert!(intent.pending().is_empty());
    }

    #[test]
    fn clear_discards_commands() {
        let mut intent = LocomotionIntent::default();
        intent.crouch();
        intent.clear();
        assert!(intent.pending().is_empty());
    }
}
