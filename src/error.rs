//! Configuration validation errors.
//!
//! Configuration is checked once before a controller starts simulating.
//! Runtime non-events (no contacts, a missed snap probe, a blocked uncrouch)
//! are never errors.

use std::fmt;

use crate::move_state::MoveStateTag;

/// A configuration value that cannot drive the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// An angle limit outside `[0°, 180°]`.
    AngleOutOfRange { field: &'static str, degrees: f32 },
    /// A duration that is zero, negative or not finite.
    NonPositiveDuration { field: &'static str, seconds: f32 },
    /// A speed, force or coefficient that is negative or not finite.
    InvalidValue { field: &'static str, value: f32 },
    /// A record that carries momentum but cannot shed it.
    NonPositiveDecel { state: MoveStateTag },
    /// A record stored in the slot of a different tag.
    TagMismatch {
        slot: MoveStateTag,
        found: MoveStateTag,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AngleOutOfRange { field, degrees } => {
                write!(f, "'{field}' must be within 0..=180 degrees, got {degrees}")
            }
            Self::NonPositiveDuration { field, seconds } => {
                write!(f, "'{field}' must be a positive duration, got {seconds}s")
            }
            Self::InvalidValue { field, value } => {
                write!(f, "'{field}' must be finite and non-negative, got {value}")
            }
            Self::NonPositiveDecel { state } => {
                write!(
                    f,
                    "move state {state:?} has momentum but a non-positive deceleration"
                )
            }
            Self::TagMismatch { slot, found } => {
                write!(f, "move state slot {slot:?} holds a record tagged {found:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub(crate) fn check_angle(field: &'static str, degrees: f32) -> Result<(), ConfigError> {
    if degrees.is_finite() && (0.0..=180.0).contains(&degrees) {
        Ok(())
    } else {
        Err(ConfigError::AngleOutOfRange { field, degrees })
    }
}

pub(crate) fn check_duration(field: &'static str, seconds: f32) -> Result<(), ConfigError> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveDuration { field, seconds })
    }
}

pub(crate) fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}
