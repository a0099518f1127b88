//! # Lockbox HAL
//!
//! Register-mapped control layer for the FPGA lockbox: a bank of four PID
//! loops with auto-relock, per-channel output limits and slow analog pins.
//!
//! Callers work in physical units (volts, V/V, 1/s); this crate converts
//! to and from the fixed-point encodings the FPGA consumes.
//!
//! ## Layers
//!
//! - [`regs`] - pure masked bit arithmetic on one word
//! - [`block`] - register block backends and the locked [`block::RegisterWindow`]
//! - [`convert`] - volts/gains ⇄ counts with calibration and saturation
//! - [`pid`], [`relock`], [`limit`], [`ams`] - the hardware models
//! - [`lockbox`] - the handle owning all three blocks
//! - [`snapshot`] - capture/apply/persist the full parameter set
//!
//! ## Example
//!
//! ```rust
//! use lockbox_common::prelude::*;
//! use lockbox_hal::Lockbox;
//!
//! let lockbox = Lockbox::simulated(CalibrationRecord::default());
//! let id = LoopId::new(1, 1)?;
//! lockbox.pid().set_setpoint(id, 0.5)?;
//! lockbox.pid().set_kp(id, 2.0)?;
//! lockbox.pid().set_relock_enabled(id, true)?;
//! assert_eq!(lockbox.pid().setpoint(id)?, 0.5);
//! # Ok::<(), LockboxError>(())
//! ```

pub mod ams;
pub mod block;
pub mod convert;
pub mod limit;
pub mod lockbox;
pub mod pid;
pub mod platform;
pub mod regs;
pub mod relock;
pub mod sim;
pub mod snapshot;

pub use ams::AmsMonitor;
pub use block::{RegisterBlock, RegisterWindow};
pub use limit::{Bound, LimitController};
pub use lockbox::Lockbox;
pub use pid::PidController;
pub use sim::SimBlock;
pub use snapshot::{LockboxSnapshot, SnapshotError};
