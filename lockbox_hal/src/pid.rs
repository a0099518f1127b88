//! PID loop model.
//!
//! Four loops share one register block. Every per-loop quantity lives in a
//! group of four consecutive words indexed by [`LoopId::slot`]; the five
//! boolean features of all loops are packed into the single `conf` word at
//! bit `feature * 4 + slot`.
//!
//! ## Fields
//!
//! | Field | Width | Units | Conversion |
//! |---|---|---|---|
//! | setpoint | 14 bit | V | input channel calibration, saturating |
//! | Kp | 24 bit | V/V | `round(kp * 2^12)`, saturating |
//! | Ki | 24 bit | 1/s | `round(ki * 2^28 * 8 ns)`, saturating |
//! | Kd | 14 bit | raw | none, truncated |
//! | conf | 20 bit | flags | one bit per (feature, loop) |

use crate::block::RegisterWindow;
use crate::convert::{
    self, KI_FACTOR, KP_FACTOR, SETPOINT_SCALE, counts_to_gain, counts_to_volts, gain_to_counts,
};
use lockbox_common::calibration::CalibrationSource;
use lockbox_common::consts::{
    LOOP_COUNT, PID_CONF_MASK, PID_CONF_OFFSET, PID_KD_MASK, PID_KD_OFFSET, PID_KI_MASK,
    PID_KI_OFFSET, PID_KP_MASK, PID_KP_OFFSET, PID_RELOCK_INPUT_OFFSET, PID_RELOCK_MAX_OFFSET,
    PID_RELOCK_MIN_OFFSET, PID_SETPOINT_MASK, PID_SETPOINT_OFFSET, PID_STEPSIZE_OFFSET, WORD_SIZE,
};
use lockbox_common::error::LockboxResult;
use lockbox_common::types::{Feature, LoopFeatures, LoopId};
use std::sync::Arc;
use tracing::debug;

// ─── Field tables ───────────────────────────────────────────────────

/// Word offsets of one loop's registers inside the PID block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoopFields {
    pub setpoint: usize,
    pub kp: usize,
    pub ki: usize,
    pub kd: usize,
    pub relock_min: usize,
    pub relock_max: usize,
    pub stepsize: usize,
    pub relock_input: usize,
}

const fn loop_fields(slot: usize) -> LoopFields {
    let at = slot * WORD_SIZE;
    LoopFields {
        setpoint: PID_SETPOINT_OFFSET + at,
        kp: PID_KP_OFFSET + at,
        ki: PID_KI_OFFSET + at,
        kd: PID_KD_OFFSET + at,
        relock_min: PID_RELOCK_MIN_OFFSET + at,
        relock_max: PID_RELOCK_MAX_OFFSET + at,
        stepsize: PID_STEPSIZE_OFFSET + at,
        relock_input: PID_RELOCK_INPUT_OFFSET + at,
    }
}

const LOOP_FIELDS: [LoopFields; LOOP_COUNT] =
    [loop_fields(0), loop_fields(1), loop_fields(2), loop_fields(3)];

const FEATURE_COUNT: usize = Feature::ALL.len();

/// `conf` bit for every (feature, slot) pair.
const FEATURE_BITS: [[u32; LOOP_COUNT]; FEATURE_COUNT] = {
    let mut table = [[0; LOOP_COUNT]; FEATURE_COUNT];
    let mut feature = 0;
    while feature < FEATURE_COUNT {
        let mut slot = 0;
        while slot < LOOP_COUNT {
            table[feature][slot] = 1 << (feature * LOOP_COUNT + slot);
            slot += 1;
        }
        feature += 1;
    }
    table
};

/// Single `conf` bit of `feature` on loop `id`.
#[inline]
pub fn feature_bit(id: LoopId, feature: Feature) -> u32 {
    FEATURE_BITS[feature.index()][id.slot()]
}

// ─── Controller ─────────────────────────────────────────────────────

/// Setter/getter surface for the four PID loops.
pub struct PidController {
    pub(crate) regs: RegisterWindow,
    calibration: Arc<dyn CalibrationSource>,
}

impl std::fmt::Debug for PidController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PidController")
            .field("regs", &self.regs)
            .finish_non_exhaustive()
    }
}

macro_rules! feature_accessors {
    ($($feature:ident => $set:ident, $get:ident;)*) => {
        $(
            #[doc = concat!("Enable or disable `", stringify!($feature), "` on one loop.")]
            pub fn $set(&self, id: LoopId, enabled: bool) -> LockboxResult<()> {
                self.set_feature(id, Feature::$feature, enabled)
            }

            #[doc = concat!("Whether `", stringify!($feature), "` is enabled on one loop.")]
            pub fn $get(&self, id: LoopId) -> LockboxResult<bool> {
                self.feature(id, Feature::$feature)
            }
        )*
    };
}

impl PidController {
    /// Wrap the PID register block.
    pub fn new(regs: RegisterWindow, calibration: Arc<dyn CalibrationSource>) -> Self {
        Self { regs, calibration }
    }

    #[inline]
    pub(crate) fn fields(id: LoopId) -> &'static LoopFields {
        &LOOP_FIELDS[id.slot()]
    }

    /// Raw 20-bit configuration word.
    pub fn conf_word(&self) -> LockboxResult<u32> {
        self.regs.get_field(PID_CONF_OFFSET, PID_CONF_MASK, 0)
    }

    // ── setpoint ──

    /// Set the setpoint in volts, through the loop's input calibration.
    ///
    /// # Errors
    /// `InvalidParameterValue` for negative or NaN volts.
    pub fn set_setpoint(&self, id: LoopId, volts: f64) -> LockboxResult<()> {
        let cal = self.calibration.current_calibration().input(id.input());
        let counts = convert::volts_to_counts(SETPOINT_SCALE, volts, cal, 0.0)?;
        debug!(loop_id = %id, volts, counts, "set setpoint");
        self.regs
            .set_field(Self::fields(id).setpoint, counts, PID_SETPOINT_MASK, 0)
    }

    /// Setpoint in volts.
    pub fn setpoint(&self, id: LoopId) -> LockboxResult<f64> {
        let counts = self
            .regs
            .get_field(Self::fields(id).setpoint, PID_SETPOINT_MASK, 0)?;
        let cal = self.calibration.current_calibration().input(id.input());
        Ok(counts_to_volts(SETPOINT_SCALE, counts, cal, 0.0))
    }

    // ── gains ──

    /// Set the proportional gain.
    ///
    /// # Errors
    /// `InvalidParameterValue` if `kp` is negative; the register is untouched.
    pub fn set_kp(&self, id: LoopId, kp: f64) -> LockboxResult<()> {
        let counts = gain_to_counts("kp", kp, KP_FACTOR, PID_KP_MASK)?;
        debug!(loop_id = %id, kp, counts, "set kp");
        self.regs.set_field(Self::fields(id).kp, counts, PID_KP_MASK, 0)
    }

    /// Proportional gain.
    pub fn kp(&self, id: LoopId) -> LockboxResult<f64> {
        let counts = self.regs.get_field(Self::fields(id).kp, PID_KP_MASK, 0)?;
        Ok(counts_to_gain(counts, KP_FACTOR))
    }

    /// Set the integral gain in 1/s.
    ///
    /// # Errors
    /// `InvalidParameterValue` if `ki` is negative; the register is untouched.
    pub fn set_ki(&self, id: LoopId, ki: f64) -> LockboxResult<()> {
        let counts = gain_to_counts("ki", ki, KI_FACTOR, PID_KI_MASK)?;
        debug!(loop_id = %id, ki, counts, "set ki");
        self.regs.set_field(Self::fields(id).ki, counts, PID_KI_MASK, 0)
    }

    /// Integral gain in 1/s.
    pub fn ki(&self, id: LoopId) -> LockboxResult<f64> {
        let counts = self.regs.get_field(Self::fields(id).ki, PID_KI_MASK, 0)?;
        Ok(counts_to_gain(counts, KI_FACTOR))
    }

    /// Set the raw derivative coefficient; bits above 14 are dropped.
    pub fn set_kd(&self, id: LoopId, kd: u32) -> LockboxResult<()> {
        debug!(loop_id = %id, kd, "set kd");
        self.regs.set_field(Self::fields(id).kd, kd, PID_KD_MASK, 0)
    }

    /// Raw derivative coefficient.
    pub fn kd(&self, id: LoopId) -> LockboxResult<u32> {
        self.regs.get_field(Self::fields(id).kd, PID_KD_MASK, 0)
    }

    // ── feature flags ──

    /// Set or clear one feature bit of one loop. No other bit changes.
    pub fn set_feature(&self, id: LoopId, feature: Feature, enabled: bool) -> LockboxResult<()> {
        let bit = feature_bit(id, feature);
        debug!(loop_id = %id, feature = feature.name(), enabled, "set feature");
        if enabled {
            self.regs.set_bits(PID_CONF_OFFSET, bit, PID_CONF_MASK)
        } else {
            self.regs.clear_bits(PID_CONF_OFFSET, bit, PID_CONF_MASK)
        }
    }

    /// Whether one feature bit of one loop is set.
    pub fn feature(&self, id: LoopId, feature: Feature) -> LockboxResult<bool> {
        self.regs
            .bits_set(PID_CONF_OFFSET, feature_bit(id, feature), PID_CONF_MASK)
    }

    /// All five feature flags of one loop.
    pub fn features(&self, id: LoopId) -> LockboxResult<LoopFeatures> {
        let conf = self.conf_word()?;
        Ok(Feature::ALL
            .into_iter()
            .filter(|&f| conf & feature_bit(id, f) != 0)
            .fold(LoopFeatures::empty(), |acc, f| acc | LoopFeatures::from(f)))
    }

    /// Replace all five feature flags of one loop in a single locked update.
    pub fn set_features(&self, id: LoopId, features: LoopFeatures) -> LockboxResult<()> {
        let (set, clear) = Feature::ALL.into_iter().fold((0, 0), |(set, clear), f| {
            if features.contains(LoopFeatures::from(f)) {
                (set | feature_bit(id, f), clear)
            } else {
                (set, clear | feature_bit(id, f))
            }
        });
        debug!(loop_id = %id, ?features, "set features");
        self.regs
            .modify(PID_CONF_OFFSET, |word| (word & !clear) | set)
            .map(|_| ())
    }

    feature_accessors! {
        IntegratorReset => set_integrator_reset, integrator_reset;
        Inverted => set_inverted, inverted;
        ResetWhenRailed => set_reset_when_railed, reset_when_railed;
        IntegratorHold => set_integrator_hold, integrator_hold;
        Relock => set_relock_enabled, relock_enabled;
    }
}
