//! Prelude module for common re-exports.
//!
//! ```rust
//! use lockbox_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LockboxConfig, LogLevel, SharedConfig};

// ─── Calibration ────────────────────────────────────────────────────
pub use crate::calibration::{
    CalibrationRecord, CalibrationSource, ChannelCalibration, SharedCalibration,
};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{ErrorKind, LockboxError, LockboxResult};

// ─── Identities ─────────────────────────────────────────────────────
pub use crate::types::{AnalogPin, Channel, Feature, LoopFeatures, LoopId};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CHANNEL_COUNT, LOOP_COUNT};
