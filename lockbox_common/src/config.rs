//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across all lockbox applications.
//!
//! # Usage
//!
//! ```rust,no_run
//! use lockbox_common::config::{ConfigError, ConfigLoader, LockboxConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = LockboxConfig::load(Path::new("lockbox.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::calibration::CalibrationRecord;
use crate::consts::DEFAULT_MEM_DEVICE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// or saving configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Serializing or writing the file failed.
    #[error("Failed to write configuration: {0}")]
    WriteError(String),
}

/// Log level for application logging.
///
/// Represents the verbosity level of logging output.
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across all lockbox applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "lockbox-lab2"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: "lockbox".to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_device() -> PathBuf {
    PathBuf::from(DEFAULT_MEM_DEVICE)
}

/// How the register blocks are reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Memory device mapped for physical register access.
    #[serde(default = "default_device")]
    pub device: PathBuf,

    /// Use in-memory register blocks instead of the device.
    #[serde(default)]
    pub simulate: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            simulate: false,
        }
    }
}

/// Top-level `lockbox.toml`.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "lockbox"
///
/// [mapping]
/// device = "/dev/mem"
///
/// [calibration]
/// input = [{ gain = 1.0, offset = 0.0 }, { gain = 1.0, offset = 0.0 }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockboxConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Register block access.
    #[serde(default)]
    pub mapping: MappingConfig,
    /// Channel calibration served to the conversion engine.
    #[serde(default)]
    pub calibration: CalibrationRecord,
}

impl LockboxConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `shared` is invalid
    /// - `mapping.device` is empty while not simulating
    /// - any calibration number is NaN or infinite
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if !self.mapping.simulate && self.mapping.device.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "mapping.device cannot be empty".to_string(),
            ));
        }

        if !self.calibration.is_finite() {
            return Err(ConfigError::ValidationError(
                "calibration values must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Write any serializable value to `path` as TOML.
///
/// # Errors
/// `ConfigError::WriteError` if serialization or the write fails.
pub fn save_toml<T: Serialize>(value: &T, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(value).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| ConfigError::WriteError(e.to_string()))
}
