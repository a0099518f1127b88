//! Platform-specific register block backends.

#[cfg(target_os = "linux")]
pub mod linux;
