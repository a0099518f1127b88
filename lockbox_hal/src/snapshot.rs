//! Save and restore every loop and limit parameter.
//!
//! A snapshot holds physical values, not counts. [`LockboxSnapshot::apply`]
//! goes through the regular setters, so clamping and rejection behave
//! exactly as for individual calls.
//!
//! # TOML Example
//!
//! ```toml
//! [[loops]]
//! id = { input = 1, output = 1 }
//! setpoint = 0.5
//! kp = 1.0
//! ki = 1000.0
//! kd = 0
//! features = "INVERTED | RELOCK"
//! relock_min = 0.5
//! relock_max = 3.0
//! relock_stepsize = 100.0
//! relock_input = "AIN0"
//!
//! [[limits]]
//! channel = 1
//! min = 0.0
//! max = 1.0
//! ```

use crate::limit::LimitController;
use crate::lockbox::Lockbox;
use crate::pid::PidController;
use lockbox_common::config::{ConfigError, ConfigLoader, save_toml};
use lockbox_common::error::LockboxError;
use lockbox_common::types::{AnalogPin, Channel, LoopFeatures, LoopId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Failure while capturing, applying or persisting a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A register access or setter failed.
    #[error(transparent)]
    Register(#[from] LockboxError),

    /// The snapshot file could not be read or written.
    #[error(transparent)]
    File(#[from] ConfigError),
}

/// Every parameter of one loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSnapshot {
    /// Which loop.
    pub id: LoopId,
    /// Setpoint in volts.
    pub setpoint: f64,
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain in 1/s.
    pub ki: f64,
    /// Raw derivative coefficient.
    pub kd: u32,
    /// Feature flags.
    #[serde(default)]
    pub features: LoopFeatures,
    /// Lower relock bound in volts.
    pub relock_min: f64,
    /// Upper relock bound in volts.
    pub relock_max: f64,
    /// Relock sweep rate in V/s.
    pub relock_stepsize: f64,
    /// Monitored slow analog input.
    pub relock_input: AnalogPin,
}

impl LoopSnapshot {
    fn capture(pid: &PidController, id: LoopId) -> Result<Self, LockboxError> {
        Ok(Self {
            id,
            setpoint: pid.setpoint(id)?,
            kp: pid.kp(id)?,
            ki: pid.ki(id)?,
            kd: pid.kd(id)?,
            features: pid.features(id)?,
            relock_min: pid.relock_min(id)?,
            relock_max: pid.relock_max(id)?,
            relock_stepsize: pid.relock_stepsize(id)?,
            relock_input: pid.relock_input(id)?,
        })
    }

    fn apply(&self, pid: &PidController) -> Result<(), LockboxError> {
        let id = self.id;
        pid.set_setpoint(id, self.setpoint)?;
        pid.set_kp(id, self.kp)?;
        pid.set_ki(id, self.ki)?;
        pid.set_kd(id, self.kd)?;
        pid.set_relock_min(id, self.relock_min)?;
        pid.set_relock_max(id, self.relock_max)?;
        pid.set_relock_stepsize(id, self.relock_stepsize)?;
        pid.set_relock_input(id, self.relock_input)?;
        pid.set_features(id, self.features)
    }
}

/// Both clamps of one output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitSnapshot {
    /// Output channel.
    pub channel: Channel,
    /// Lower clamp in volts.
    pub min: f64,
    /// Upper clamp in volts.
    pub max: f64,
}

impl LimitSnapshot {
    fn capture(limit: &LimitController, channel: Channel) -> Result<Self, LockboxError> {
        Ok(Self {
            channel,
            min: limit.min(channel)?,
            max: limit.max(channel)?,
        })
    }

    fn apply(&self, limit: &LimitController) -> Result<(), LockboxError> {
        limit.set_min(self.channel, self.min)?;
        limit.set_max(self.channel, self.max)
    }
}

/// Full parameter set of a lockbox.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockboxSnapshot {
    /// Loop parameters, normally one entry per loop.
    #[serde(default)]
    pub loops: Vec<LoopSnapshot>,
    /// Limit parameters, normally one entry per output channel.
    #[serde(default)]
    pub limits: Vec<LimitSnapshot>,
}

impl LockboxSnapshot {
    /// Read every loop and limit parameter.
    pub fn capture(lockbox: &Lockbox) -> Result<Self, SnapshotError> {
        let loops = LoopId::ALL
            .into_iter()
            .map(|id| LoopSnapshot::capture(lockbox.pid(), id))
            .collect::<Result<_, _>>()?;
        let limits = Channel::ALL
            .into_iter()
            .map(|ch| LimitSnapshot::capture(lockbox.limit(), ch))
            .collect::<Result<_, _>>()?;
        Ok(Self { loops, limits })
    }

    /// Write every parameter in the snapshot, in order.
    ///
    /// Stops at the first rejected value; entries before it stay applied.
    pub fn apply(&self, lockbox: &Lockbox) -> Result<(), SnapshotError> {
        for entry in &self.loops {
            entry.apply(lockbox.pid())?;
        }
        for entry in &self.limits {
            entry.apply(lockbox.limit())?;
        }
        info!(
            loops = self.loops.len(),
            limits = self.limits.len(),
            "snapshot applied"
        );
        Ok(())
    }

    /// Write the snapshot to `path` as TOML.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        save_toml(self, path)?;
        info!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Read a snapshot from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let snapshot = <Self as ConfigLoader>::load(path)?;
        info!(path = %path.display(), "snapshot loaded");
        Ok(snapshot)
    }
}
