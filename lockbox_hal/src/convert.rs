//! Physical units ⇄ register counts.
//!
//! Two overflow policies live side by side and must not be mixed up:
//!
//! - conversions here **saturate**: a value beyond the field's range is
//!   pinned to the nearest representable count (and logged at `warn`)
//! - raw field writes in [`crate::regs`] **truncate** to the mask
//!
//! Negative or NaN values for unsigned quantities are rejected with
//! `InvalidParameterValue` instead of being clamped to zero.

use crate::regs::sign_extend;
use lockbox_common::calibration::ChannelCalibration;
use lockbox_common::consts::{
    ANALOG_IN_MAX_VAL, ANALOG_IN_MAX_VAL_INTEGER, ANALOG_IN_MIN_VAL, ANALOG_OUT_MAX_VAL,
    ANALOG_OUT_MAX_VAL_INTEGER, ANALOG_OUT_MIN_VAL, DATA_BIT_LENGTH, INPUT_MAX, LIMIT_MAX,
    OUTPUT_MAX, PID_DACCOUNT, PID_ISR, PID_PSR, PID_STEPSR, PID_TIMESTEP, SETPOINT_MAX,
};
use lockbox_common::error::{LockboxError, LockboxResult};
use tracing::warn;

/// Fraction of a count tolerated as float error in truncating conversions.
const TRUNCATION_SLACK: f64 = 1e-9;

/// Encoding of one voltage field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldScale {
    /// Field width in bits (1..=31).
    pub bit_width: u32,
    /// Volts represented by the full count range.
    pub full_scale: f64,
    /// Two's complement field; the top bit is the sign.
    pub signed: bool,
}

/// Loop setpoint: 14 bit unsigned over 1 V.
pub const SETPOINT_SCALE: FieldScale = FieldScale::unsigned(DATA_BIT_LENGTH, SETPOINT_MAX);
/// Output limit: 14 bit unsigned over 1 V.
pub const LIMIT_SCALE: FieldScale = FieldScale::unsigned(DATA_BIT_LENGTH, LIMIT_MAX);
/// Fast ADC readback: 14 bit signed over ±1 V.
pub const FAST_IN_SCALE: FieldScale = FieldScale::signed(DATA_BIT_LENGTH, INPUT_MAX);
/// Fast DAC readback: 14 bit signed over ±1 V.
pub const FAST_OUT_SCALE: FieldScale = FieldScale::signed(DATA_BIT_LENGTH, OUTPUT_MAX);

/// Counts per unit of proportional gain.
pub const KP_FACTOR: f64 = (1u32 << PID_PSR) as f64;
/// Counts per unit of integral gain (1/s).
pub const KI_FACTOR: f64 = (1u32 << PID_ISR) as f64 * PID_TIMESTEP;
/// Counts per V/s of relock slew rate.
pub const STEPSIZE_FACTOR: f64 = (1u32 << PID_STEPSR) as f64 * PID_TIMESTEP / PID_DACCOUNT;

impl FieldScale {
    /// Unsigned field of `bit_width` bits spanning `0..full_scale`.
    pub const fn unsigned(bit_width: u32, full_scale: f64) -> Self {
        Self {
            bit_width,
            full_scale,
            signed: false,
        }
    }

    /// Signed field of `bit_width` bits spanning `-full_scale..full_scale`.
    pub const fn signed(bit_width: u32, full_scale: f64) -> Self {
        Self {
            bit_width,
            full_scale,
            signed: true,
        }
    }

    /// Mask covering the whole field.
    pub const fn mask(&self) -> u32 {
        (1u32 << self.bit_width) - 1
    }

    /// Counts per full scale.
    fn span(&self) -> f64 {
        let bits = if self.signed { self.bit_width - 1 } else { self.bit_width };
        f64::from(1u32 << bits)
    }

    /// Smallest representable count.
    pub const fn min_count(&self) -> i64 {
        if self.signed {
            -(1i64 << (self.bit_width - 1))
        } else {
            0
        }
    }

    /// Largest representable count.
    pub const fn max_count(&self) -> i64 {
        if self.signed {
            (1i64 << (self.bit_width - 1)) - 1
        } else {
            (1i64 << self.bit_width) - 1
        }
    }

    /// Volts represented by one count with ideal calibration.
    pub fn lsb(&self) -> f64 {
        self.full_scale / self.span()
    }
}

/// Encode `volts` into a field of `scale`.
///
/// `cal` is the channel's calibration and `user_offset` an extra DC shift
/// in volts, both subtracted before scaling. Out-of-range results saturate.
///
/// # Errors
/// `InvalidParameterValue` for NaN, or for negative `volts` on an
/// unsigned field.
pub fn volts_to_counts(
    scale: FieldScale,
    volts: f64,
    cal: ChannelCalibration,
    user_offset: f64,
) -> LockboxResult<u32> {
    if volts.is_nan() || (!scale.signed && volts < 0.0) {
        return Err(LockboxError::invalid("voltage", volts));
    }

    let shifted = volts - cal.effective_offset() - user_offset;
    let raw = (shifted / scale.full_scale * cal.effective_gain() * scale.span()).round();

    let (min, max) = (scale.min_count(), scale.max_count());
    let counts = if raw > max as f64 {
        warn!(volts, counts = max, "voltage above field range, saturating");
        max
    } else if raw < min as f64 {
        warn!(volts, counts = min, "voltage below field range, saturating");
        min
    } else {
        raw as i64
    };

    Ok((counts as u32) & scale.mask())
}

/// Decode a field of `scale` back into volts; inverse of [`volts_to_counts`].
///
/// Unsigned fields never decode below 0.0 V, so a readback is always
/// accepted by the matching setter even under a negative offset.
pub fn counts_to_volts(
    scale: FieldScale,
    raw: u32,
    cal: ChannelCalibration,
    user_offset: f64,
) -> f64 {
    let raw = raw & scale.mask();
    let counts = if scale.signed {
        f64::from(sign_extend(raw, scale.bit_width))
    } else {
        f64::from(raw)
    };
    let volts = counts / scale.span() / cal.effective_gain() * scale.full_scale
        + cal.effective_offset()
        + user_offset;
    if scale.signed { volts } else { volts.max(0.0) }
}

/// Encode a non-negative gain as `round(value * factor)`, saturating at `mask`.
///
/// # Errors
/// `InvalidParameterValue` if `value` is negative or NaN.
pub fn gain_to_counts(what: &'static str, value: f64, factor: f64, mask: u32) -> LockboxResult<u32> {
    if value.is_nan() || value < 0.0 {
        return Err(LockboxError::invalid(what, value));
    }
    let raw = (value * factor).round();
    if raw > f64::from(mask) {
        warn!(what, value, counts = mask, "value above field range, saturating");
        Ok(mask)
    } else {
        Ok(raw as u32)
    }
}

/// Decode a gain stored with [`gain_to_counts`].
pub fn counts_to_gain(counts: u32, factor: f64) -> f64 {
    f64::from(counts) / factor
}

/// Map volts on the fixed slow-input range (0.0 to 7.0 V) onto 12-bit counts.
///
/// Truncates toward zero and saturates at both ends; no calibration is
/// applied.
///
/// # Errors
/// `InvalidParameterValue` for NaN.
pub fn absolute_to_counts(volts: f64) -> LockboxResult<u32> {
    if volts.is_nan() {
        return Err(LockboxError::invalid("absolute voltage", volts));
    }
    let scaled = (volts - ANALOG_IN_MIN_VAL) / (ANALOG_IN_MAX_VAL - ANALOG_IN_MIN_VAL)
        * f64::from(ANALOG_IN_MAX_VAL_INTEGER);
    // Values a hair below an integer count truncate up, so a voltage read
    // back with counts_to_absolute encodes to the same count.
    // `as` saturates: negatives become 0.
    let counts = ((scaled + TRUNCATION_SLACK) as u32).min(ANALOG_IN_MAX_VAL_INTEGER);
    if scaled < 0.0 || scaled >= f64::from(ANALOG_IN_MAX_VAL_INTEGER + 1) {
        warn!(volts, counts, "absolute voltage outside 0-7 V, saturating");
    }
    Ok(counts)
}

/// Inverse of [`absolute_to_counts`].
pub fn counts_to_absolute(counts: u32) -> f64 {
    f64::from(counts) / f64::from(ANALOG_IN_MAX_VAL_INTEGER)
        * (ANALOG_IN_MAX_VAL - ANALOG_IN_MIN_VAL)
        + ANALOG_IN_MIN_VAL
}

/// Map volts onto the slow DAC range (0.0 to 1.8 V over 156 counts).
///
/// # Errors
/// `InvalidParameterValue` if `volts` is negative or NaN.
pub fn analog_out_to_counts(volts: f64) -> LockboxResult<u32> {
    if volts.is_nan() || volts < 0.0 {
        return Err(LockboxError::invalid("analog output voltage", volts));
    }
    let scaled = (volts - ANALOG_OUT_MIN_VAL) / (ANALOG_OUT_MAX_VAL - ANALOG_OUT_MIN_VAL)
        * f64::from(ANALOG_OUT_MAX_VAL_INTEGER);
    if scaled > f64::from(ANALOG_OUT_MAX_VAL_INTEGER) {
        warn!(volts, "analog output above 1.8 V, saturating");
        return Ok(ANALOG_OUT_MAX_VAL_INTEGER);
    }
    Ok((scaled + TRUNCATION_SLACK) as u32)
}

/// Inverse of [`analog_out_to_counts`].
pub fn counts_to_analog_out(counts: u32) -> f64 {
    f64::from(counts) / f64::from(ANALOG_OUT_MAX_VAL_INTEGER)
        * (ANALOG_OUT_MAX_VAL - ANALOG_OUT_MIN_VAL)
        + ANALOG_OUT_MIN_VAL
}
