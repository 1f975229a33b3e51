//! Per-character locomotion state.

use bevy::prelude::*;

use crate::contact::ContactAccumulator;
use crate::momentum::MomentumScheduler;
use crate::move_state::{
    MoveStateListener, MoveStateMachine, MoveStateRecord, MoveStateSet, MoveStateTag,
};

/// Input magnitudes at or below this count as idle.
const IDLE_EPSILON: f32 = 1e-4;

/// Contact predicates as they stood when the last step finished.
///
/// The live contact buckets are cleared at the end of every step, so
/// observers outside the step read this instead.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStatus {
    pub on_ground: bool,
    pub on_wall: bool,
    pub climbing: bool,
    pub ground_normal: Vec3,
    pub wall_normal: Vec3,
    pub climb_normal: Vec3,
}

/// Runtime state of a first-person locomotion controller.
///
/// Holds the contact buckets of the current step, the step counters behind
/// the jump grace window, the move state machine and the effective move
/// speed. Updated once per fixed step by the locomotion systems.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CharacterController {
    /// Velocity written to the body at the end of the last step.
    pub velocity: Vec3,
    /// Horizontal speed read at the start of the last step.
    pub current_speed: f32,
    /// Vertical speed read at the start of the last step.
    pub current_y_speed: f32,

    // === Contacts ===
    pub(crate) contacts: ContactAccumulator,
    pub(crate) status: StepStatus,
    /// Ground normal of the last step, up when airborne.
    pub(crate) ground_normal: Vec3,
    pub previous_wall_normal: Vec3,

    // === Step counters ===
    pub steps_since_last_grounded: u32,
    /// Negative right after [`Self::prevent_snapping_to_ground`], which
    /// holds the ground off for one step longer than a jump does.
    pub steps_since_last_jump: i32,
    pub steps_since_jump_tried: u32,
    pub(crate) jump_grace_steps: u32,

    // === Move state ===
    pub(crate) machine: MoveStateMachine,
    pub(crate) momentum: MomentumScheduler,
    /// Effective speed limit, gliding between state speeds.
    pub move_speed: f32,

    // === Crouch ===
    pub crouching: bool,
    pub uncrouch_queued: bool,

    // === Intent ===
    pub jump_requested: bool,
    /// Local move input: `x` = strafe, `y` = forward.
    pub input_direction: Vec2,
    pub climb_requested: bool,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self::new(&MoveStateSet::default())
    }
}

impl CharacterController {
    /// Create a controller bound to the default record of `states`.
    pub fn new(states: &MoveStateSet) -> Self {
        Self {
            velocity: Vec3::ZERO,
            current_speed: 0.0,
            current_y_speed: 0.0,
            contacts: ContactAccumulator::default(),
            status: StepStatus::default(),
            ground_normal: Vec3::Y,
            previous_wall_normal: Vec3::ZERO,
            steps_since_last_grounded: 0,
            steps_since_last_jump: i32::MAX,
            steps_since_jump_tried: u32::MAX,
            jump_grace_steps: 2,
            machine: MoveStateMachine::new(states.default),
            momentum: MomentumScheduler::default(),
            move_speed: states.default.speed,
            crouching: false,
            uncrouch_queued: false,
            jump_requested: false,
            input_direction: Vec2::ZERO,
            climb_requested: false,
        }
    }

    /// Rebind to the default record of `states`, dropping any move state
    /// history and glide.
    pub(crate) fn bind_states(&mut self, states: &MoveStateSet) {
        self.machine = MoveStateMachine::new(states.default);
        self.momentum = MomentumScheduler::default();
        self.move_speed = states.default.speed;
    }

    // === Control surface ===

    /// Set the local move input, clamped to unit length.
    pub fn set_input_direction(&mut self, direction: Vec2) {
        self.input_direction = direction.clamp_length_max(1.0);
    }

    /// Request a jump. The request stays pending until honored or expired.
    pub fn try_jump(&mut self) {
        self.jump_requested = true;
        self.steps_since_jump_tried = 0;
    }

    /// Set whether climbing is held.
    pub fn climb(&mut self, held: bool) {
        self.climb_requested = held;
    }

    /// Open the jump grace window without jumping, so the ground is ignored
    /// for the next `jump_grace_steps + 1` steps.
    pub fn prevent_snapping_to_ground(&mut self) {
        self.steps_since_last_jump = -1;
    }

    // === Predicates ===

    #[inline]
    fn grace_over(&self) -> bool {
        i64::from(self.steps_since_last_jump) > i64::from(self.jump_grace_steps)
    }

    /// Check if standing on ground in the step in flight.
    pub(crate) fn step_on_ground(&self) -> bool {
        self.contacts.has_ground() && self.grace_over()
    }

    /// Check if touching a wall in the step in flight.
    pub(crate) fn step_on_wall(&self) -> bool {
        self.contacts.has_wall() && self.grace_over()
    }

    /// Check if holding onto a climbable surface in the step in flight.
    pub(crate) fn step_climbing(&self) -> bool {
        self.contacts.has_climb() && self.grace_over()
    }

    pub(crate) fn step_wall_normal(&self) -> Vec3 {
        self.contacts.wall_normal
    }

    pub(crate) fn step_climb_normal(&self) -> Vec3 {
        self.contacts.climb_normal
    }

    /// Check if the last step ended on the ground.
    pub fn on_ground(&self) -> bool {
        self.status.on_ground
    }

    /// Check if the last step ended touching a wall.
    pub fn on_wall(&self) -> bool {
        self.status.on_wall
    }

    /// Check if the last step ended climbing.
    pub fn climbing(&self) -> bool {
        self.status.climbing
    }

    /// Check if airborne (neither grounded nor climbing) after the last step.
    pub fn is_airborne(&self) -> bool {
        !self.on_ground() && !self.climbing()
    }

    /// Check if there is no move input.
    pub fn is_idle(&self) -> bool {
        self.input_direction.length_squared() <= IDLE_EPSILON * IDLE_EPSILON
    }

    /// Ground normal, or up when there is no ground.
    pub fn ground_normal(&self) -> Vec3 {
        self.ground_normal
    }

    /// Wall normal of the last step, zero without a wall.
    pub fn wall_normal(&self) -> Vec3 {
        self.status.wall_normal
    }

    /// Climb normal of the last step, zero when not climbing.
    pub fn climb_normal(&self) -> Vec3 {
        self.status.climb_normal
    }

    /// Contact buckets of the step in flight. Empty between steps.
    pub fn contacts(&self) -> &ContactAccumulator {
        &self.contacts
    }

    /// Predicates of the last finished step.
    pub fn status(&self) -> &StepStatus {
        &self.status
    }

    /// Freeze the current predicates into [`Self::status`].
    pub(crate) fn record_status(&mut self) {
        self.status = StepStatus {
            on_ground: self.step_on_ground(),
            on_wall: self.step_on_wall(),
            climbing: self.step_climbing(),
            ground_normal: self.ground_normal,
            wall_normal: self.contacts.wall_normal,
            climb_normal: self.contacts.climb_normal,
        };
    }

    // === Move state ===

    pub fn move_state(&self) -> MoveStateTag {
        self.machine.tag()
    }

    pub fn current_record(&self) -> &MoveStateRecord {
        self.machine.current()
    }

    pub fn last_record(&self) -> &MoveStateRecord {
        self.machine.last()
    }

    pub fn momentum(&self) -> &MomentumScheduler {
        &self.momentum
    }

    /// Switch to `target`, notifying `listener`.
    ///
    /// Entering a record that disallows crouching queues an uncrouch, which
    /// still waits for overhead clearance.
    pub fn transition(
        &mut self,
        target: MoveStateRecord,
        listener: &mut dyn MoveStateListener,
    ) -> bool {
        let changed = self.machine.transition(target, listener);
        if self.crouching && !target.allows_crouching {
            self.uncrouch_queued = true;
        }
        if changed && target.resets_jump_grace {
            self.prevent_snapping_to_ground();
        }
        changed
    }

    /// Return to the default record.
    pub fn reset_move_state(
        &mut self,
        states: &MoveStateSet,
        listener: &mut dyn MoveStateListener,
    ) -> bool {
        self.transition(states.default, listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ContactSample;
    use crate::move_state::NoListener;

    fn grounded_contacts() -> ContactAccumulator {
        let mut acc = ContactAccumulator::default();
        acc.add(
            &ContactSample::on_any_layer(Vec3::Y),
            &crate::config::ControllerConfig::default().contact_thresholds(),
            false,
            Vec3::NEG_Z,
        );
        acc
    }

    #[test]
    fn new_controller_is_default_and_airborne() {
        let controller = CharacterController::default();
        assert_eq!(controller.move_state(), MoveStateTag::Default);
        assert_eq!(controller.move_speed, MoveStateRecord::walking().speed);
        assert!(controller.is_airborne());
        assert_eq!(controller.ground_normal(), Vec3::Y);
    }

    #[test]
    fn grace_window_hides_contacts() {
        let mut controller = CharacterController::default();
        controller.contacts = grounded_contacts();
        assert!(controller.step_on_ground());

        let grace = controller.jump_grace_steps as i32;
        for steps in -1..=grace {
            controller.steps_since_last_jump = steps;
            assert!(!controller.step_on_ground(), "grounded at step {steps}");
        }

        controller.steps_since_last_jump = grace + 1;
        assert!(controller.step_on_ground());
    }

    #[test]
    fn prevent_snapping_opens_grace_window() {
        let mut controller = CharacterController::default();
        controller.contacts = grounded_contacts();
        controller.prevent_snapping_to_ground();
        assert!(!controller.step_on_ground());
    }

    #[test]
    fn observers_read_the_recorded_status() {
        let mut controller = CharacterController::default();
        controller.steps_since_last_jump = 10;
        controller.contacts = grounded_contacts();
        controller.record_status();
        controller.contacts.clear();

        assert!(!controller.step_on_ground());
        assert!(controller.on_ground());
        assert!(!controller.is_airborne());
        assert_eq!(controller.wall_normal(), Vec3::ZERO);
    }

    #[test]
    fn input_is_clamped_to_unit_length() {
        let mut controller = CharacterController::default();
        controller.set_input_direction(Vec2::new(3.0, 4.0));
        assert!((controller.input_direction.length() - 1.0).abs() < 1e-6);
        controller.set_input_direction(Vec2::new(0.3, 0.0));
        assert_eq!(controller.input_direction, Vec2::new(0.3, 0.0));
    }

    #[test]
    fn try_jump_restarts_expiry_counter() {
        let mut controller = CharacterController::default();
        controller.steps_since_jump_tried = 40;
        controller.try_jump();
        assert!(controller.jump_requested);
        assert_eq!(controller.steps_since_jump_tried, 0);
    }

    #[test]
    fn entering_uncrouchable_state_queues_uncrouch() {
        let mut controller = CharacterController::default();
        controller.crouching = true;

        controller.transition(MoveStateRecord::dashing(), &mut NoListener);

        assert!(controller.uncrouch_queued);
        assert!(controller.crouching);
    }

    #[test]
    fn resets_jump_grace_state_opens_window() {
        let mut controller = CharacterController::default();
        let record = MoveStateRecord {
            resets_jump_grace: true,
            ..MoveStateRecord::dashing()
        };
        controller.transition(record, &mut NoListener);
        assert_eq!(controller.steps_since_last_jump, -1);
    }

    #[test]
    fn reset_move_state_returns_to_default() {
        let states = MoveStateSet::default();
        let mut controller = CharacterController::new(&states);
        controller.transition(states.charging, &mut NoListener);
        controller.reset_move_state(&states, &mut NoListener);
        assert_eq!(controller.move_state(), MoveStateTag::Default);
        assert_eq!(controller.last_record().tag, MoveStateTag::Charging);
    }
}
