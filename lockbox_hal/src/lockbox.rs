//! The lockbox handle: all three register blocks plus their calibration.
//!
//! Blocks are mapped when the handle is built and unmapped when it is
//! dropped. A mapping failure is reported once, from [`Lockbox::open`].

use crate::ams::AmsMonitor;
use crate::block::{RegisterBlock, RegisterWindow};
use crate::limit::LimitController;
use crate::pid::PidController;
use crate::sim::SimBlock;
use lockbox_common::calibration::{CalibrationRecord, CalibrationSource, SharedCalibration};
use lockbox_common::config::LockboxConfig;
use lockbox_common::consts::{
    AMS_BASE_ADDR, AMS_BASE_SIZE, LIMIT_BASE_ADDR, LIMIT_BASE_SIZE, PID_BASE_ADDR, PID_BASE_SIZE,
};
use lockbox_common::error::LockboxResult;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Physical placement of one register block.
#[derive(Debug, Clone, Copy)]
struct BlockPlacement {
    name: &'static str,
    addr: usize,
    size: usize,
}

const PID_BLOCK: BlockPlacement = BlockPlacement {
    name: "pid",
    addr: PID_BASE_ADDR,
    size: PID_BASE_SIZE,
};
const LIMIT_BLOCK: BlockPlacement = BlockPlacement {
    name: "limit",
    addr: LIMIT_BASE_ADDR,
    size: LIMIT_BASE_SIZE,
};
const AMS_BLOCK: BlockPlacement = BlockPlacement {
    name: "ams",
    addr: AMS_BASE_ADDR,
    size: AMS_BASE_SIZE,
};

/// Owned access to the PID, limit and AMS blocks.
///
/// `Lockbox` is `Send + Sync`; share it behind an `Arc` between sessions.
#[derive(Debug)]
pub struct Lockbox {
    pid: PidController,
    limit: LimitController,
    ams: AmsMonitor,
    calibration: SharedCalibration,
}

impl Lockbox {
    /// Build from a loaded configuration: simulated blocks if
    /// `mapping.simulate` is set, otherwise mapped from `mapping.device`.
    ///
    /// # Errors
    /// `ResourceUnavailable` if any block cannot be mapped.
    pub fn open(config: &LockboxConfig) -> LockboxResult<Self> {
        if config.mapping.simulate {
            return Ok(Self::simulated(config.calibration));
        }
        Self::map_device(&config.mapping.device, config.calibration)
    }

    /// Map all blocks from `device`.
    ///
    /// # Errors
    /// `ResourceUnavailable` if any block cannot be mapped.
    #[cfg(target_os = "linux")]
    pub fn map_device(device: &Path, calibration: CalibrationRecord) -> LockboxResult<Self> {
        use crate::platform::linux::DevMemBlock;

        let map = |at: BlockPlacement| {
            DevMemBlock::open(device, at.name, at.addr, at.size)
                .map(|block| RegisterWindow::new(at.name, block))
        };
        let pid = map(PID_BLOCK)?;
        let limit = map(LIMIT_BLOCK)?;
        let ams = map(AMS_BLOCK)?;
        info!(device = %device.display(), "lockbox register blocks mapped");
        Ok(Self::from_windows(pid, limit, ams, SharedCalibration::new(calibration)))
    }

    /// Physical mapping is only available on Linux.
    ///
    /// # Errors
    /// Always `ResourceUnavailable`.
    #[cfg(not(target_os = "linux"))]
    pub fn map_device(device: &Path, _calibration: CalibrationRecord) -> LockboxResult<Self> {
        Err(lockbox_common::error::LockboxError::ResourceUnavailable {
            block: PID_BLOCK.name,
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("cannot map {} on this platform", device.display()),
            ),
        })
    }

    /// In-memory blocks, all registers zero.
    pub fn simulated(calibration: CalibrationRecord) -> Self {
        let sim = |at: BlockPlacement| RegisterWindow::new(at.name, SimBlock::new(at.size));
        info!("lockbox running on simulated register blocks");
        Self::from_windows(
            sim(PID_BLOCK),
            sim(LIMIT_BLOCK),
            sim(AMS_BLOCK),
            SharedCalibration::new(calibration),
        )
    }

    /// Assemble from caller-provided blocks.
    pub fn from_blocks(
        pid: impl RegisterBlock + 'static,
        limit: impl RegisterBlock + 'static,
        ams: impl RegisterBlock + 'static,
        calibration: SharedCalibration,
    ) -> Self {
        Self::from_windows(
            RegisterWindow::new(PID_BLOCK.name, pid),
            RegisterWindow::new(LIMIT_BLOCK.name, limit),
            RegisterWindow::new(AMS_BLOCK.name, ams),
            calibration,
        )
    }

    fn from_windows(
        pid: RegisterWindow,
        limit: RegisterWindow,
        ams: RegisterWindow,
        calibration: SharedCalibration,
    ) -> Self {
        let source: Arc<dyn CalibrationSource> = Arc::new(calibration.clone());
        Self {
            pid: PidController::new(pid, Arc::clone(&source)),
            limit: LimitController::new(limit, Arc::clone(&source)),
            ams: AmsMonitor::new(ams, source),
            calibration,
        }
    }

    /// PID loops and relock.
    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    /// Output limiter.
    pub fn limit(&self) -> &LimitController {
        &self.limit
    }

    /// Slow analog pins and fast readback.
    pub fn ams(&self) -> &AmsMonitor {
        &self.ams
    }

    /// Calibration in force; clones observe later reloads.
    pub fn calibration(&self) -> &SharedCalibration {
        &self.calibration
    }

    /// Swap in new calibration; the next conversion uses it.
    pub fn reload_calibration(&self, record: CalibrationRecord) {
        self.calibration.replace(record);
        info!("calibration reloaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_common::types::{Channel, LoopId};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn lockbox_is_shareable() {
        assert_send_sync::<Lockbox>();
    }

    #[test]
    fn open_honours_simulate_flag() {
        let mut config = LockboxConfig::default();
        config.mapping.simulate = true;
        config.mapping.device = "/nonexistent/mem".into();
        let lockbox = Lockbox::open(&config).unwrap();
        assert_eq!(lockbox.pid().conf_word().unwrap(), 0);
    }

    #[test]
    fn reload_reaches_every_model() {
        let lockbox = Lockbox::simulated(CalibrationRecord::default());
        let id = LoopId::new(1, 1).unwrap();
        lockbox.pid().set_setpoint(id, 0.5).unwrap();
        lockbox.limit().set_max(Channel::Ch1, 0.5).unwrap();

        let mut rec = CalibrationRecord::default();
        rec.input[0].offset = 0.1;
        rec.output[0].offset = 0.2;
        lockbox.reload_calibration(rec);

        assert!((lockbox.pid().setpoint(id).unwrap() - 0.6).abs() < 1e-12);
        assert!((lockbox.limit().max(Channel::Ch1).unwrap() - 0.7).abs() < 1e-12);
    }
}
