//! Relock parameters of the PID loops.
//!
//! When relock is enabled and the monitored slow analog input leaves
//! `[min, max]`, the loop output is swept with the configured step size
//! until the input is back inside the window.
//!
//! The bounds are absolute voltages on the slow input range (0.0 to 7.0 V
//! over 12 bits). Unlike the setpoint they never go through channel
//! calibration. Nothing checks that `min <= max`.

use crate::convert::{
    STEPSIZE_FACTOR, absolute_to_counts, counts_to_absolute, counts_to_gain, gain_to_counts,
};
use crate::pid::PidController;
use lockbox_common::consts::{PID_RELOCK_INPUT_MASK, PID_RELOCK_MASK, PID_STEPSIZE_MASK};
use lockbox_common::error::{LockboxError, LockboxResult};
use lockbox_common::types::{AnalogPin, LoopId};
use tracing::debug;

impl PidController {
    /// Set the lower relock bound in volts (saturates to 0.0..7.0 V).
    pub fn set_relock_min(&self, id: LoopId, volts: f64) -> LockboxResult<()> {
        let counts = absolute_to_counts(volts)?;
        debug!(loop_id = %id, volts, counts, "set relock min");
        self.regs
            .set_field(Self::fields(id).relock_min, counts, PID_RELOCK_MASK, 0)
    }

    /// Lower relock bound in volts.
    pub fn relock_min(&self, id: LoopId) -> LockboxResult<f64> {
        let counts = self
            .regs
            .get_field(Self::fields(id).relock_min, PID_RELOCK_MASK, 0)?;
        Ok(counts_to_absolute(counts))
    }

    /// Set the upper relock bound in volts (saturates to 0.0..7.0 V).
    pub fn set_relock_max(&self, id: LoopId, volts: f64) -> LockboxResult<()> {
        let counts = absolute_to_counts(volts)?;
        debug!(loop_id = %id, volts, counts, "set relock max");
        self.regs
            .set_field(Self::fields(id).relock_max, counts, PID_RELOCK_MASK, 0)
    }

    /// Upper relock bound in volts.
    pub fn relock_max(&self, id: LoopId) -> LockboxResult<f64> {
        let counts = self
            .regs
            .get_field(Self::fields(id).relock_max, PID_RELOCK_MASK, 0)?;
        Ok(counts_to_absolute(counts))
    }

    /// Set the relock sweep rate in V/s.
    ///
    /// # Errors
    /// `InvalidParameterValue` if `volts_per_second` is negative.
    pub fn set_relock_stepsize(&self, id: LoopId, volts_per_second: f64) -> LockboxResult<()> {
        let counts = gain_to_counts(
            "relock stepsize",
            volts_per_second,
            STEPSIZE_FACTOR,
            PID_STEPSIZE_MASK,
        )?;
        debug!(loop_id = %id, volts_per_second, counts, "set relock stepsize");
        self.regs
            .set_field(Self::fields(id).stepsize, counts, PID_STEPSIZE_MASK, 0)
    }

    /// Relock sweep rate in V/s.
    pub fn relock_stepsize(&self, id: LoopId) -> LockboxResult<f64> {
        let counts = self
            .regs
            .get_field(Self::fields(id).stepsize, PID_STEPSIZE_MASK, 0)?;
        Ok(counts_to_gain(counts, STEPSIZE_FACTOR))
    }

    /// Select the slow analog input monitored by relock.
    ///
    /// # Errors
    /// `OutOfRange` if `pin` is an output pin; the register is untouched.
    pub fn set_relock_input(&self, id: LoopId, pin: AnalogPin) -> LockboxResult<()> {
        if !pin.is_input() {
            return Err(LockboxError::out_of_range("relock input pin", pin.id()));
        }
        let index = pin.id() - AnalogPin::Ain0.id();
        debug!(loop_id = %id, %pin, "set relock input");
        self.regs
            .set_field(Self::fields(id).relock_input, index, PID_RELOCK_INPUT_MASK, 0)
    }

    /// Like [`set_relock_input`](Self::set_relock_input) but from a raw pin id.
    ///
    /// # Errors
    /// `OutOfRange` if `pin_id` names no pin or an output pin.
    pub fn set_relock_input_id(&self, id: LoopId, pin_id: u32) -> LockboxResult<()> {
        self.set_relock_input(id, AnalogPin::from_id(pin_id)?)
    }

    /// Slow analog input monitored by relock.
    pub fn relock_input(&self, id: LoopId) -> LockboxResult<AnalogPin> {
        let index = self
            .regs
            .get_field(Self::fields(id).relock_input, PID_RELOCK_INPUT_MASK, 0)?;
        AnalogPin::from_id(AnalogPin::Ain0.id() + index)
    }
}
