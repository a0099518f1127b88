//! Lockbox Common Library
//!
//! Shared register map, identity types, calibration and configuration
//! loading for all lockbox workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Register map and fixed-point constants
//! - [`types`] - Channel, loop, feature and analog pin identities
//! - [`calibration`] - Calibration records and sources
//! - [`config`] - Configuration loading traits and types
//! - [`error`] - Register-level error type
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use lockbox_common::prelude::*;
//!
//! let id = LoopId::new(1, 2).unwrap();
//! assert_eq!(id.slot(), 2);
//! ```

pub mod calibration;
pub mod config;
pub mod consts;
pub mod error;
pub mod prelude;
pub mod types;
