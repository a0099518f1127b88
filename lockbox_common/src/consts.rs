//! Register map and numeric constants for the lockbox FPGA image.
//!
//! Single source of truth for block addresses, field offsets, field masks
//! and fixed-point scale factors. Imported by all crates; no duplication
//! permitted.
//!
//! ## Blocks
//!
//! | Block | Base          | Size   |
//! |-------|---------------|--------|
//! | PID   | `0x4030_0000` | `0x90` |
//! | AMS   | `0x4040_0000` | `0x60` |
//! | Limit | `0x4060_0000` | `0x10` |

use static_assertions::const_assert;

/// Start of the FPGA register window in the physical address space.
pub const FPGA_BASE_ADDR: usize = 0x4000_0000;

/// Default memory device used to map the register window.
pub const DEFAULT_MEM_DEVICE: &str = "/dev/mem";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lockbox/lockbox.toml";

/// Width of one register word in bytes.
pub const WORD_SIZE: usize = 4;

/// Number of PID loops (2 inputs × 2 outputs).
pub const LOOP_COUNT: usize = 4;

/// Number of fast input and output channels.
pub const CHANNEL_COUNT: usize = 2;

/// Number of slow analog pins per direction.
pub const APIN_COUNT: usize = 4;

// ─── PID block ──────────────────────────────────────────────────────

/// PID block physical base address.
pub const PID_BASE_ADDR: usize = FPGA_BASE_ADDR + 0x0030_0000;
/// PID block size in bytes (conf + 3 reserved + 8 groups of 4 loop words).
pub const PID_BASE_SIZE: usize = 0x90;

/// Shared configuration word.
pub const PID_CONF_OFFSET: usize = 0x00;
/// First setpoint word; one word per loop slot follows.
pub const PID_SETPOINT_OFFSET: usize = 0x10;
/// First Kp word.
pub const PID_KP_OFFSET: usize = 0x20;
/// First Ki word.
pub const PID_KI_OFFSET: usize = 0x30;
/// First Kd word.
pub const PID_KD_OFFSET: usize = 0x40;
/// First relock minimum word.
pub const PID_RELOCK_MIN_OFFSET: usize = 0x50;
/// First relock maximum word.
pub const PID_RELOCK_MAX_OFFSET: usize = 0x60;
/// First relock step size word.
pub const PID_STEPSIZE_OFFSET: usize = 0x70;
/// First relock input selector word.
pub const PID_RELOCK_INPUT_OFFSET: usize = 0x80;

/// Configuration word mask (20 bits: 5 features × 4 loops).
pub const PID_CONF_MASK: u32 = 0xF_FFFF;
/// Setpoint mask (14 bits).
pub const PID_SETPOINT_MASK: u32 = 0x3FFF;
/// Kp mask (24 bits).
pub const PID_KP_MASK: u32 = 0xFF_FFFF;
/// Ki mask (24 bits).
pub const PID_KI_MASK: u32 = 0xFF_FFFF;
/// Kd mask (14 bits).
pub const PID_KD_MASK: u32 = 0x3FFF;
/// Relock step size mask (24 bits).
pub const PID_STEPSIZE_MASK: u32 = 0xFF_FFFF;
/// Relock minimum/maximum mask (12 bits).
pub const PID_RELOCK_MASK: u32 = 0xFFF;
/// Relock input selector mask (2 bits).
pub const PID_RELOCK_INPUT_MASK: u32 = 0x3;

/// Sampling period of the control loop in seconds (125 MS/s).
pub const PID_TIMESTEP: f64 = 8e-9;
/// One DAC count in volts (2 V / 2^14).
pub const PID_DACCOUNT: f64 = 1.221e-4;
/// P gain = Kp >> PID_PSR.
pub const PID_PSR: u32 = 12;
/// I gain = Ki >> PID_ISR.
pub const PID_ISR: u32 = 28;
/// Slew rate in DAC counts per clock cycle = stepsize >> PID_STEPSR.
pub const PID_STEPSR: u32 = 18;

/// Full scale of a setpoint in volts.
pub const SETPOINT_MAX: f64 = 1.0;
/// Bit length of the fast data path.
pub const DATA_BIT_LENGTH: u32 = 14;

// ─── Limit block ────────────────────────────────────────────────────

/// Output limiter physical base address.
pub const LIMIT_BASE_ADDR: usize = FPGA_BASE_ADDR + 0x0060_0000;
/// Output limiter block size in bytes.
pub const LIMIT_BASE_SIZE: usize = 0x10;
/// Output 1 minimum word; max follows, then output 2 min/max.
pub const LIMIT_CH1_MIN_OFFSET: usize = 0x00;
/// Output 1 maximum word.
pub const LIMIT_CH1_MAX_OFFSET: usize = 0x04;
/// Output 2 minimum word.
pub const LIMIT_CH2_MIN_OFFSET: usize = 0x08;
/// Output 2 maximum word.
pub const LIMIT_CH2_MAX_OFFSET: usize = 0x0C;
/// Limit field mask (14 bits).
pub const LIMIT_MASK: u32 = 0x3FFF;
/// Full scale of an output limit in volts.
pub const LIMIT_MAX: f64 = 1.0;

// ─── Analog mixed signals block ─────────────────────────────────────

/// Analog mixed signals physical base address.
pub const AMS_BASE_ADDR: usize = FPGA_BASE_ADDR + 0x0040_0000;
/// Analog mixed signals block size in bytes.
pub const AMS_BASE_SIZE: usize = 0x60;
/// Slow ADC words `aif[0..4]`.
pub const AMS_AIF_OFFSET: usize = 0x00;
/// Slow DAC words `dac[0..4]`.
pub const AMS_DAC_OFFSET: usize = 0x20;
/// Fast ADC readback words `fadc[0..2]`.
pub const AMS_FADC_OFFSET: usize = 0x4C;
/// Fast DAC readback words `fdac[0..2]`.
pub const AMS_FDAC_OFFSET: usize = 0x54;

/// Slow DAC field mask (8 bits).
pub const ANALOG_OUT_MASK: u32 = 0xFF;
/// Slow DAC field position inside the word.
pub const ANALOG_OUT_BITS: u32 = 16;
/// Slow ADC field mask (12 bits).
pub const ANALOG_IN_MASK: u32 = 0xFFF;
/// Fast ADC/DAC readback mask (14 bits).
pub const FAST_DATA_MASK: u32 = 0x3FFF;

/// Upper end of the absolute slow analog input range in volts.
pub const ANALOG_IN_MAX_VAL: f64 = 7.0;
/// Lower end of the absolute slow analog input range in volts.
pub const ANALOG_IN_MIN_VAL: f64 = 0.0;
/// Slow analog input count at `ANALOG_IN_MAX_VAL`.
pub const ANALOG_IN_MAX_VAL_INTEGER: u32 = 0xFFF;
/// Upper end of the slow analog output range in volts.
pub const ANALOG_OUT_MAX_VAL: f64 = 1.8;
/// Lower end of the slow analog output range in volts.
pub const ANALOG_OUT_MIN_VAL: f64 = 0.0;
/// Slow analog output count at `ANALOG_OUT_MAX_VAL`.
pub const ANALOG_OUT_MAX_VAL_INTEGER: u32 = 156;

/// Full scale of the fast inputs in volts.
pub const INPUT_MAX: f64 = 1.0;
/// Full scale of the fast outputs in volts.
pub const OUTPUT_MAX: f64 = 1.0;

// Every per-loop word group must fit inside its block.
const_assert!(PID_RELOCK_INPUT_OFFSET + LOOP_COUNT * WORD_SIZE == PID_BASE_SIZE);
const_assert!(LIMIT_CH2_MAX_OFFSET + WORD_SIZE == LIMIT_BASE_SIZE);
const_assert!(AMS_FDAC_OFFSET + CHANNEL_COUNT * WORD_SIZE <= AMS_BASE_SIZE);
const_assert!(AMS_DAC_OFFSET + APIN_COUNT * WORD_SIZE <= AMS_FADC_OFFSET);
const_assert!(PID_RELOCK_MASK == ANALOG_IN_MAX_VAL_INTEGER);
const_assert!(ANALOG_OUT_MAX_VAL_INTEGER <= ANALOG_OUT_MASK);
const_assert!(PID_CONF_MASK.count_ones() as usize == 5 * LOOP_COUNT);
