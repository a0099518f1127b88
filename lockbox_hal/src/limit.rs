//! Output limiter.
//!
//! Each fast output has a 14-bit minimum and maximum clamp, converted
//! through that output's calibration. The two bounds are independent
//! registers; nothing enforces `min <= max`.

use crate::block::RegisterWindow;
use crate::convert::{LIMIT_SCALE, counts_to_volts, volts_to_counts};
use lockbox_common::calibration::CalibrationSource;
use lockbox_common::consts::{
    LIMIT_CH1_MAX_OFFSET, LIMIT_CH1_MIN_OFFSET, LIMIT_CH2_MAX_OFFSET, LIMIT_CH2_MIN_OFFSET,
    LIMIT_MASK,
};
use lockbox_common::error::LockboxResult;
use lockbox_common::types::Channel;
use std::sync::Arc;
use tracing::debug;

/// (min, max) word offsets per output channel.
const LIMIT_FIELDS: [(usize, usize); 2] = [
    (LIMIT_CH1_MIN_OFFSET, LIMIT_CH1_MAX_OFFSET),
    (LIMIT_CH2_MIN_OFFSET, LIMIT_CH2_MAX_OFFSET),
];

/// Which end of the output range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Lower clamp.
    Min,
    /// Upper clamp.
    Max,
}

/// Setter/getter surface for the output limits.
pub struct LimitController {
    regs: RegisterWindow,
    calibration: Arc<dyn CalibrationSource>,
}

impl std::fmt::Debug for LimitController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitController")
            .field("regs", &self.regs)
            .finish_non_exhaustive()
    }
}

impl LimitController {
    /// Wrap the limit register block.
    pub fn new(regs: RegisterWindow, calibration: Arc<dyn CalibrationSource>) -> Self {
        Self { regs, calibration }
    }

    fn offset(channel: Channel, bound: Bound) -> usize {
        let (min, max) = LIMIT_FIELDS[channel.index()];
        match bound {
            Bound::Min => min,
            Bound::Max => max,
        }
    }

    /// Set one bound of `channel` in volts.
    ///
    /// # Errors
    /// `InvalidParameterValue` for negative or NaN volts.
    pub fn set_limit(&self, channel: Channel, bound: Bound, volts: f64) -> LockboxResult<()> {
        let cal = self.calibration.current_calibration().output(channel);
        let counts = volts_to_counts(LIMIT_SCALE, volts, cal, 0.0)?;
        debug!(%channel, ?bound, volts, counts, "set limit");
        self.regs
            .set_field(Self::offset(channel, bound), counts, LIMIT_MASK, 0)
    }

    /// One bound of `channel` in volts.
    pub fn limit(&self, channel: Channel, bound: Bound) -> LockboxResult<f64> {
        let counts = self
            .regs
            .get_field(Self::offset(channel, bound), LIMIT_MASK, 0)?;
        let cal = self.calibration.current_calibration().output(channel);
        Ok(counts_to_volts(LIMIT_SCALE, counts, cal, 0.0))
    }

    /// Set the lower output clamp.
    pub fn set_min(&self, channel: Channel, volts: f64) -> LockboxResult<()> {
        self.set_limit(channel, Bound::Min, volts)
    }

    /// Lower output clamp.
    pub fn min(&self, channel: Channel) -> LockboxResult<f64> {
        self.limit(channel, Bound::Min)
    }

    /// Set the upper output clamp.
    pub fn set_max(&self, channel: Channel, volts: f64) -> LockboxResult<()> {
        self.set_limit(channel, Bound::Max, volts)
    }

    /// Upper output clamp.
    pub fn max(&self, channel: Channel) -> LockboxResult<f64> {
        self.limit(channel, Bound::Max)
    }
}
