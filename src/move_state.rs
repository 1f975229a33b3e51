//! Movement states.
//!
//! Every state is a [`MoveStateRecord`]: plain data describing speed,
//! acceleration, gravity/drag policy and momentum rules. One
//! [`MoveStateMachine`] holds the current and previous record; abilities
//! request transitions and are told about every transition through
//! [`MoveStateListener`].

use bevy::prelude::*;

use crate::error::{check_non_negative, ConfigError};

/// Identifies a movement state.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MoveStateTag {
    /// Plain walking/falling, no ability active.
    #[default]
    Default,
    Dashing,
    Climbing,
    Charging,
    Punching,
}

impl MoveStateTag {
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Dashing,
        Self::Climbing,
        Self::Charging,
        Self::Punching,
    ];
}

/// Immutable per-state movement parameters.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MoveStateRecord {
    pub tag: MoveStateTag,

    // === Acceleration ===
    /// Steering acceleration while grounded or climbing.
    pub ground_accel: f32,
    /// Steering acceleration while airborne.
    pub air_accel: f32,

    // === Speed ===
    /// Speed limit of this state.
    pub speed: f32,
    /// Vertical speed ceiling, used when `has_separate_y_speed` is set or
    /// while this state's momentum is being carried.
    pub y_speed: f32,
    /// Rate at which carried momentum decays while grounded.
    pub ground_decel: f32,
    /// Rate at which carried momentum decays while airborne.
    pub air_decel: f32,

    // === Policy ===
    /// Leaving this state carries its speed into the next one.
    pub has_momentum: bool,
    /// Entering this state accepts carried speed.
    pub accepts_momentum: bool,
    pub has_gravity: bool,
    pub has_ground_drag: bool,
    pub has_ungrounded_drag: bool,
    /// Steering axes come from the climbed surface instead of the ground.
    pub sets_movement_axis: bool,
    pub blocks_move_input: bool,
    /// Entering this state re-opens the jump grace window.
    pub resets_jump_grace: bool,
    pub has_separate_y_speed: bool,
    pub allows_crouching: bool,
    /// Fixed steering surface for states that set the movement axis.
    /// `None` uses the live climb normal.
    pub surface_normal: Option<Vec3>,
}

impl Default for MoveStateRecord {
    fn default() -> Self {
        Self {
            tag: MoveStateTag::Default,
            ground_accel: 30.0,
            air_accel: 10.0,
            speed: 11.0,
            y_speed: 11.0,
            ground_decel: 20.0,
            air_decel: 10.0,
            has_momentum: false,
            accepts_momentum: true,
            has_gravity: true,
            has_ground_drag: true,
            has_ungrounded_drag: false,
            sets_movement_axis: false,
            blocks_move_input: false,
            resets_jump_grace: false,
            has_separate_y_speed: false,
            allows_crouching: true,
            surface_normal: None,
        }
    }
}

impl MoveStateRecord {
    /// Plain walking and falling.
    pub fn walking() -> Self {
        Self::default()
    }

    /// Short burst after a dash impulse. Input is ignored, gravity is off and
    /// the burst speed bleeds off into the next state.
    pub fn dashing() -> Self {
        Self {
            tag: MoveStateTag::Dashing,
            speed: 30.0,
            y_speed: 4.0,
            ground_decel: 40.0,
            air_decel: 25.0,
            has_momentum: true,
            accepts_momentum: false,
            has_gravity: false,
            has_ground_drag: false,
            blocks_move_input: true,
            has_separate_y_speed: true,
            allows_crouching: false,
            ..default()
        }
    }

    /// Wall climbing. Steering follows the wall surface.
    pub fn climbing() -> Self {
        Self {
            tag: MoveStateTag::Climbing,
            ground_accel: 12.0,
            air_accel: 12.0,
            speed: 3.0,
            y_speed: 3.0,
            accepts_momentum: false,
            has_gravity: false,
            sets_movement_axis: true,
            allows_crouching: false,
            ..default()
        }
    }

    /// Winding up a punch: slow, drag in the air.
    pub fn charging() -> Self {
        Self {
            tag: MoveStateTag::Charging,
            ground_accel: 20.0,
            air_accel: 5.0,
            speed: 4.0,
            accepts_momentum: false,
            has_ungrounded_drag: true,
            ..default()
        }
    }

    /// The punch lunge itself.
    pub fn punching() -> Self {
        Self {
            tag: MoveStateTag::Punching,
            speed: 25.0,
            y_speed: 6.0,
            ground_decel: 35.0,
            air_decel: 20.0,
            has_momentum: true,
            accepts_momentum: false,
            has_ground_drag: false,
            blocks_move_input: true,
            has_separate_y_speed: true,
            allows_crouching: false,
            ..default()
        }
    }

    /// Builder: set speed and vertical ceiling.
    pub fn with_speed(mut self, speed: f32, y_speed: f32) -> Self {
        self.speed = speed;
        self.y_speed = y_speed;
        self
    }

    /// Builder: set steering accelerations.
    pub fn with_accel(mut self, ground: f32, air: f32) -> Self {
        self.ground_accel = ground;
        self.air_accel = air;
        self
    }

    /// Builder: set momentum decay rates.
    pub fn with_decel(mut self, ground: f32, air: f32) -> Self {
        self.ground_decel = ground;
        self.air_decel = air;
        self
    }

    /// Builder: set momentum rules.
    pub fn with_momentum(mut self, has: bool, accepts: bool) -> Self {
        self.has_momentum = has;
        self.accepts_momentum = accepts;
        self
    }

    /// Builder: pin the steering surface.
    pub fn with_surface_normal(mut self, normal: Vec3) -> Self {
        self.surface_normal = Some(normal.normalize_or_zero());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("ground_accel", self.ground_accel)?;
        check_non_negative("air_accel", self.air_accel)?;
        check_non_negative("speed", self.speed)?;
        check_non_negative("y_speed", self.y_speed)?;
        check_non_negative("ground_decel", self.ground_decel)?;
        check_non_negative("air_decel", self.air_decel)?;
        if self.has_momentum && (self.ground_decel <= 0.0 || self.air_decel <= 0.0) {
            return Err(ConfigError::NonPositiveDecel { state: self.tag });
        }
        Ok(())
    }
}

/// The full set of records a controller can switch between.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MoveStateSet {
    pub default: MoveStateRecord,
    pub dashing: MoveStateRecord,
    pub climbing: MoveStateRecord,
    pub charging: MoveStateRecord,
    pub punching: MoveStateRecord,
}

impl Default for MoveStateSet {
    fn default() -> Self {
        Self {
            default: MoveStateRecord::walking(),
            dashing: MoveStateRecord::dashing(),
            climbing: MoveStateRecord::climbing(),
            charging: MoveStateRecord::charging(),
            punching: MoveStateRecord::punching(),
        }
    }
}

impl MoveStateSet {
    /// Look up the record for a tag.
    pub fn get(&self, tag: MoveStateTag) -> &MoveStateRecord {
        match tag {
            MoveStateTag::Default => &self.default,
            MoveStateTag::Dashing => &self.dashing,
            MoveStateTag::Climbing => &self.climbing,
            MoveStateTag::Charging => &self.charging,
            MoveStateTag::Punching => &self.punching,
        }
    }

    /// Builder: replace the record stored under its own tag.
    pub fn with_record(mut self, record: MoveStateRecord) -> Self {
        match record.tag {
            MoveStateTag::Default => self.default = record,
            MoveStateTag::Dashing => self.dashing = record,
            MoveStateTag::Climbing => self.climbing = record,
            MoveStateTag::Charging => self.charging = record,
            MoveStateTag::Punching => self.punching = record,
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for slot in MoveStateTag::ALL {
            let record = self.get(slot);
            if record.tag != slot {
                return Err(ConfigError::TagMismatch {
                    slot,
                    found: record.tag,
                });
            }
            record.validate()?;
        }
        Ok(())
    }
}

/// Receives every move state transition, synchronously, before the
/// transition call returns.
pub trait MoveStateListener {
    fn on_move_state_changed(&mut self, state: MoveStateTag);
}

/// A transition requested by an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRequest {
    /// Switch to the record of this tag.
    Enter(MoveStateTag),
    /// Return to the default record.
    Reset,
}

impl StateRequest {
    pub fn target(&self) -> MoveStateTag {
        match self {
            Self::Enter(tag) => *tag,
            Self::Reset => MoveStateTag::Default,
        }
    }
}

/// Current and previous move state.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct MoveStateMachine {
    current: MoveStateRecord,
    last: MoveStateRecord,
    /// Record the velocity solver last settled on.
    settled: MoveStateRecord,
}

impl MoveStateMachine {
    /// Start in the given (default) record.
    pub fn new(initial: MoveStateRecord) -> Self {
        Self {
            current: initial,
            last: initial,
            settled: initial,
        }
    }

    #[inline]
    pub fn current(&self) -> &MoveStateRecord {
        &self.current
    }

    #[inline]
    pub fn last(&self) -> &MoveStateRecord {
        &self.last
    }

    #[inline]
    pub fn tag(&self) -> MoveStateTag {
        self.current.tag
    }

    /// Switch to `target` and notify `listener`.
    ///
    /// Returns whether the tag changed.
    pub fn transition(
        &mut self,
        target: MoveStateRecord,
        listener: &mut dyn MoveStateListener,
    ) -> bool {
        self.last = self.current;
        self.current = target;
        let changed = self.last.tag != target.tag;
        if changed {
            debug!("move state {:?} -> {:?}", self.last.tag, target.tag);
        }
        listener.on_move_state_changed(target.tag);
        changed
    }

    /// Return to the default record.
    pub fn reset(
        &mut self,
        states: &MoveStateSet,
        listener: &mut dyn MoveStateListener,
    ) -> bool {
        self.transition(states.default, listener)
    }

    /// Report the transition since the solver last looked, as
    /// `(previous, current)`, and mark the current record as settled.
    pub fn take_change(&mut self) -> Option<(MoveStateRecord, MoveStateRecord)> {
        let previous = self.settled;
        self.settled = self.current;
        (previous.tag != self.current.tag).then_some((previous, self.current))
    }
}

/// Listener that ignores every notification.
pub struct NoListener;

impl MoveStateListener for NoListener {
    fn on_move_state_changed(&mut self, _state: MoveStateTag) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<MoveStateTag>);

    impl MoveStateListener for Recorder {
        fn on_move_state_changed(&mut self, state: MoveStateTag) {
            self.0.push(state);
        }
    }

    #[test]
    fn presets_carry_their_tags() {
        let set = MoveStateSet::default();
        for tag in MoveStateTag::ALL {
            assert_eq!(set.get(tag).tag, tag);
        }
        assert!(set.validate().is_ok());
    }

    #[test]
    fn machine_starts_in_initial_record() {
        let machine = MoveStateMachine::new(MoveStateRecord::walking());
        assert_eq!(machine.tag(), MoveStateTag::Default);
        assert_eq!(machine.last().tag, MoveStateTag::Default);
    }

    #[test]
    fn transition_records_previous_and_notifies() {
        let mut machine = MoveStateMachine::new(MoveStateRecord::walking());
        let mut recorder = Recorder::default();

        let changed = machine.transition(MoveStateRecord::dashing(), &mut recorder);

        assert!(changed);
        assert_eq!(machine.tag(), MoveStateTag::Dashing);
        assert_eq!(machine.last().tag, MoveStateTag::Default);
        assert_eq!(recorder.0, vec![MoveStateTag::Dashing]);
    }

    #[test]
    fn same_tag_transition_still_notifies() {
        let mut machine = MoveStateMachine::new(MoveStateRecord::walking());
        let mut recorder = Recorder::default();

        let changed = machine.transition(MoveStateRecord::walking(), &mut recorder);

        assert!(!changed);
        assert_eq!(recorder.0.len(), 1);
    }

    #[test]
    fn reset_always_yields_default() {
        let states = MoveStateSet::default();
        let mut machine = MoveStateMachine::new(states.default);
        for tag in MoveStateTag::ALL {
            machine.transition(*states.get(tag), &mut NoListener);
            machine.reset(&states, &mut NoListener);
            assert_eq!(machine.tag(), MoveStateTag::Default);
        }
    }

    #[test]
    fn take_change_reports_once() {
        let mut machine = MoveStateMachine::new(MoveStateRecord::walking());
        assert!(machine.take_change().is_none());

        machine.transition(MoveStateRecord::dashing(), &mut NoListener);
        let (from, to) = machine.take_change().unwrap();
        assert_eq!(from.tag, MoveStateTag::Default);
        assert_eq!(to.tag, MoveStateTag::Dashing);
        assert!(machine.take_change().is_none());
    }

    #[test]
    fn take_change_spans_several_transitions() {
        let mut machine = MoveStateMachine::new(MoveStateRecord::walking());
        machine.transition(MoveStateRecord::charging(), &mut NoListener);
        machine.transition(MoveStateRecord::punching(), &mut NoListener);

        let (from, to) = machine.take_change().unwrap();
        assert_eq!(from.tag, MoveStateTag::Default);
        assert_eq!(to.tag, MoveStateTag::Punching);
    }

    #[test]
    fn round_trip_to_same_tag_is_no_change() {
        let mut machine = MoveStateMachine::new(MoveStateRecord::walking());
        machine.transition(MoveStateRecord::dashing(), &mut NoListener);
        machine.transition(MoveStateRecord::walking(), &mut NoListener);
        assert!(machine.take_change().is_none());
    }

    #[test]
    fn set_rejects_misplaced_record() {
        let mut set = MoveStateSet::default();
        set.climbing = MoveStateRecord::dashing();
        assert_eq!(
            set.validate(),
            Err(ConfigError::TagMismatch {
                slot: MoveStateTag::Climbing,
                found: MoveStateTag::Dashing
            })
        );
    }

    #[test]
    fn momentum_record_needs_decel() {
        let record = MoveStateRecord::dashing().with_decel(0.0, 10.0);
        assert_eq!(
            record.validate(),
            Err(ConfigError::NonPositiveDecel {
                state: MoveStateTag::Dashing
            })
        );
    }

    #[test]
    fn with_record_replaces_by_tag() {
        let fast_dash = MoveStateRecord::dashing().with_speed(50.0, 5.0);
        let set = MoveStateSet::default().with_record(fast_dash);
        assert_eq!(set.dashing.speed, 50.0);
    }
}
