//! Per-channel calibration records and the sources that serve them.
//!
//! Conversions never cache calibration: every call asks its
//! [`CalibrationSource`] for the current record, so a reload that lands
//! between two calls takes effect on the very next conversion.
//!
//! # TOML Example
//!
//! ```toml
//! [calibration]
//! input = [{ gain = 1.0, offset = 0.0 }, { gain = 0.998, offset = -0.002 }]
//! output = [{ gain = 1.0, offset = 0.0 }, { gain = 1.0, offset = 0.0 }]
//! ```

use crate::consts::CHANNEL_COUNT;
use crate::types::Channel;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

fn default_gain() -> f64 {
    1.0
}

/// Full-scale gain and DC offset of one analog channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalibration {
    /// Dimensionless full-scale correction (1.0 = ideal).
    #[serde(default = "default_gain")]
    pub gain: f64,
    /// DC offset in volts.
    #[serde(default)]
    pub offset: f64,
}

impl Default for ChannelCalibration {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
        }
    }
}

impl ChannelCalibration {
    /// Gain to use in a conversion.
    ///
    /// A zero, negative or non-finite gain would turn every conversion into
    /// infinities, so it falls back to unity.
    pub fn effective_gain(&self) -> f64 {
        if self.gain.is_finite() && self.gain > 0.0 {
            self.gain
        } else {
            warn!(gain = self.gain, "unusable calibration gain, using 1.0");
            1.0
        }
    }

    /// Offset to use in a conversion (non-finite offsets count as zero).
    pub fn effective_offset(&self) -> f64 {
        if self.offset.is_finite() {
            self.offset
        } else {
            warn!(offset = self.offset, "unusable calibration offset, using 0.0");
            0.0
        }
    }

    /// True if both numbers are finite.
    pub fn is_finite(&self) -> bool {
        self.gain.is_finite() && self.offset.is_finite()
    }
}

/// Calibration of all four fast channels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Front-end (input) channels 1 and 2.
    #[serde(default)]
    pub input: [ChannelCalibration; CHANNEL_COUNT],
    /// Back-end (output) channels 1 and 2.
    #[serde(default)]
    pub output: [ChannelCalibration; CHANNEL_COUNT],
}

impl CalibrationRecord {
    /// Front-end calibration of `channel`.
    #[inline]
    pub fn input(&self, channel: Channel) -> ChannelCalibration {
        self.input[channel.index()]
    }

    /// Back-end calibration of `channel`.
    #[inline]
    pub fn output(&self, channel: Channel) -> ChannelCalibration {
        self.output[channel.index()]
    }

    /// True if every number in the record is finite.
    pub fn is_finite(&self) -> bool {
        self.input.iter().chain(self.output.iter()).all(ChannelCalibration::is_finite)
    }
}

/// Something that can hand out the calibration in force right now.
pub trait CalibrationSource: Send + Sync {
    /// Fetch the current record. Called once per conversion.
    fn current_calibration(&self) -> CalibrationRecord;
}

impl CalibrationSource for CalibrationRecord {
    fn current_calibration(&self) -> CalibrationRecord {
        *self
    }
}

/// Calibration shared with a loader that may replace it at any time.
///
/// Cloning is cheap; all clones observe the same record.
#[derive(Debug, Clone, Default)]
pub struct SharedCalibration {
    inner: Arc<RwLock<CalibrationRecord>>,
}

impl SharedCalibration {
    /// Wrap an initial record.
    pub fn new(record: CalibrationRecord) -> Self {
        Self {
            inner: Arc::new(RwLock::new(record)),
        }
    }

    /// Swap in a new record (hot reload). Returns the previous one.
    pub fn replace(&self, record: CalibrationRecord) -> CalibrationRecord {
        std::mem::replace(&mut *self.inner.write(), record)
    }
}

impl CalibrationSource for SharedCalibration {
    fn current_calibration(&self) -> CalibrationRecord {
        *self.inner.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_ideal() {
        let rec = CalibrationRecord::default();
        for ch in Channel::ALL {
            assert_eq!(rec.input(ch).gain, 1.0);
            assert_eq!(rec.output(ch).offset, 0.0);
        }
    }

    #[test]
    fn unusable_gain_falls_back_to_unity() {
        for gain in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let cal = ChannelCalibration { gain, offset: 0.0 };
            assert_eq!(cal.effective_gain(), 1.0, "gain {gain}");
        }
        let cal = ChannelCalibration {
            gain: 0.5,
            offset: f64::NAN,
        };
        assert_eq!(cal.effective_gain(), 0.5);
        assert_eq!(cal.effective_offset(), 0.0);
        assert!(!cal.is_finite());
    }

    #[test]
    fn shared_calibration_hot_reload_is_visible_to_clones() {
        let shared = SharedCalibration::default();
        let reader = shared.clone();

        let mut rec = CalibrationRecord::default();
        rec.input[1].gain = 0.75;
        let old = shared.replace(rec);

        assert_eq!(old, CalibrationRecord::default());
        assert_eq!(reader.current_calibration().input(Channel::Ch2).gain, 0.75);
    }

    #[test]
    fn record_deserializes_with_defaults() {
        #[derive(Deserialize)]
        struct Wrapper {
            calibration: CalibrationRecord,
        }
        let w: Wrapper = toml::from_str(
            r#"
[calibration]
input = [{ gain = 0.9 }, { offset = 0.01 }]
"#,
        )
        .unwrap();
        assert_eq!(w.calibration.input[0].gain, 0.9);
        assert_eq!(w.calibration.input[0].offset, 0.0);
        assert_eq!(w.calibration.input[1].gain, 1.0);
        assert_eq!(w.calibration.input[1].offset, 0.01);
        assert_eq!(w.calibration.output, [ChannelCalibration::default(); 2]);
    }
}
