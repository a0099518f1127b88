//! Error types for register-level lockbox operations.
//!
//! Every failed call returns exactly one [`LockboxError`]. Nothing is
//! retried internally; retry policy belongs to whoever dispatches commands.
//!
//! Saturation and field-mask truncation are *not* errors. The table below
//! lists which setters reject and which clamp:
//!
//! | Setter | Rejects (`InvalidParameterValue`) | Saturates silently |
//! |---|---|---|
//! | setpoint | negative volts, NaN | above full scale |
//! | Kp / Ki | negative gain, NaN | above 24-bit mask |
//! | Kd | never | truncated to 14-bit mask |
//! | relock step size | negative rate, NaN | above 24-bit mask |
//! | relock min / max | NaN | outside 0.0–7.0 V |
//! | limit min / max | negative volts, NaN | above full scale |
//! | slow analog output | negative volts, NaN | above 1.8 V |
//!
//! NaN is rejected by every setter that converts a float. Unsigned
//! getters never report a negative voltage, so any readback can be
//! written back unchanged.

use std::fmt;
use thiserror::Error;

/// Discriminant of a [`LockboxError`], cheap to copy into a protocol reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Channel, loop or pin identity outside the valid enumeration.
    OutOfRange,
    /// Negative (or NaN) value where only non-negative values are meaningful.
    InvalidParameterValue,
    /// Register block could not be mapped.
    ResourceUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OutOfRange => "out of range",
            Self::InvalidParameterValue => "invalid parameter value",
            Self::ResourceUnavailable => "resource unavailable",
        };
        f.write_str(s)
    }
}

/// Errors returned by register access, conversion and the loop models.
#[derive(Debug, Error)]
pub enum LockboxError {
    /// Identity (channel, loop, pin, register offset) not in its enumeration.
    #[error("{what} out of range: {value}")]
    OutOfRange {
        /// What was being addressed.
        what: &'static str,
        /// The rejected raw value.
        value: i64,
    },

    /// Physically meaningless value (e.g. a negative gain).
    #[error("invalid value for {what}: {value}")]
    InvalidParameterValue {
        /// Which parameter was rejected.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Register block could not be mapped.
    #[error("register block '{block}' unavailable: {source}")]
    ResourceUnavailable {
        /// Block name.
        block: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl LockboxError {
    /// The error's discriminant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InvalidParameterValue { .. } => ErrorKind::InvalidParameterValue,
            Self::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
        }
    }

    /// Shorthand for [`LockboxError::OutOfRange`].
    pub fn out_of_range(what: &'static str, value: impl Into<i64>) -> Self {
        Self::OutOfRange {
            what,
            value: value.into(),
        }
    }

    /// Shorthand for [`LockboxError::InvalidParameterValue`].
    pub fn invalid(what: &'static str, value: f64) -> Self {
        Self::InvalidParameterValue { what, value }
    }
}

/// Result alias for lockbox operations.
pub type LockboxResult<T> = Result<T, LockboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let e = LockboxError::out_of_range("input channel", 3);
        assert_eq!(e.kind(), ErrorKind::OutOfRange);

        let e = LockboxError::InvalidParameterValue {
            what: "Ki",
            value: -0.1,
        };
        assert_eq!(e.kind(), ErrorKind::InvalidParameterValue);

        let e = LockboxError::ResourceUnavailable {
            block: "pid",
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(e.kind(), ErrorKind::ResourceUnavailable);
    }

    #[test]
    fn display_names_the_parameter() {
        let e = LockboxError::InvalidParameterValue {
            what: "Kp",
            value: -1.5,
        };
        assert_eq!(e.to_string(), "invalid value for Kp: -1.5");
        assert_eq!(ErrorKind::OutOfRange.to_string(), "out of range");
    }
}
