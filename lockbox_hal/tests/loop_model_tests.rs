//! Loop, relock and limit behaviour through the public lockbox handle.

use lockbox_common::consts::{
    AMS_BASE_SIZE, LIMIT_BASE_SIZE, PID_BASE_SIZE, PID_KI_OFFSET, PID_RELOCK_INPUT_OFFSET,
    PID_SETPOINT_OFFSET, WORD_SIZE,
};
use lockbox_common::prelude::*;
use lockbox_hal::{Lockbox, RegisterBlock, SimBlock};
use parking_lot::Mutex;
use std::sync::{Arc, Barrier};

fn lockbox() -> Lockbox {
    Lockbox::simulated(CalibrationRecord::default())
}

/// PID block whose words stay visible to the test after handing it over.
#[derive(Clone)]
struct ProbeBlock(Arc<Mutex<Vec<u32>>>);

impl ProbeBlock {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(vec![0; PID_BASE_SIZE / WORD_SIZE])))
    }

    fn word(&self, offset: usize) -> u32 {
        self.0.lock()[offset / WORD_SIZE]
    }
}

impl RegisterBlock for ProbeBlock {
    fn len(&self) -> usize {
        self.0.lock().len() * WORD_SIZE
    }

    fn read(&self, offset: usize) -> u32 {
        self.word(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.0.lock()[offset / WORD_SIZE] = value;
    }
}

fn probed_lockbox() -> (Lockbox, ProbeBlock) {
    let probe = ProbeBlock::new();
    let lb = Lockbox::from_blocks(
        probe.clone(),
        SimBlock::new(LIMIT_BASE_SIZE),
        SimBlock::new(AMS_BASE_SIZE),
        SharedCalibration::default(),
    );
    (lb, probe)
}

#[test]
fn test_setpoint_half_volt_scenario() -> LockboxResult<()> {
    let (lb, probe) = probed_lockbox();
    let id = LoopId::new(1, 1)?;

    lb.pid().set_setpoint(id, 0.5)?;

    assert_eq!(probe.word(PID_SETPOINT_OFFSET), 8192);
    assert_eq!(lb.pid().setpoint(id)?, 0.5);
    Ok(())
}

#[test]
fn test_loops_land_in_their_slots() -> LockboxResult<()> {
    let (lb, probe) = probed_lockbox();
    // (input, output) -> slot: (1,1)=0, (2,1)=1, (1,2)=2, (2,2)=3
    lb.pid().set_setpoint(LoopId::new(1, 2)?, 0.25)?;
    assert_eq!(probe.word(PID_SETPOINT_OFFSET + 2 * WORD_SIZE), 4096);
    assert_eq!(probe.word(PID_SETPOINT_OFFSET + WORD_SIZE), 0);
    Ok(())
}

#[test]
fn test_setpoint_uses_input_channel_calibration() -> LockboxResult<()> {
    let mut rec = CalibrationRecord::default();
    rec.input[1].offset = 0.25;
    let lb = Lockbox::simulated(rec);

    // Loop IN2:OUT1 is calibrated by input 2, loop IN1:OUT2 by input 1.
    let in2 = LoopId::new(2, 1)?;
    let in1 = LoopId::new(1, 2)?;
    lb.pid().set_setpoint(in2, 0.5)?;
    lb.pid().set_setpoint(in1, 0.5)?;

    assert!((lb.pid().setpoint(in2)? - 0.5).abs() < 1e-12);
    // Strip the offset back out to see the stored counts differ.
    lb.reload_calibration(CalibrationRecord::default());
    assert!((lb.pid().setpoint(in2)? - 0.25).abs() < 1e-12);
    assert_eq!(lb.pid().setpoint(in1)?, 0.5);
    Ok(())
}

#[test]
fn test_negative_ki_leaves_register_unchanged() -> LockboxResult<()> {
    let (lb, probe) = probed_lockbox();
    for id in LoopId::ALL {
        lb.pid().set_ki(id, 250.0)?;
        let offset = PID_KI_OFFSET + id.slot() * WORD_SIZE;
        let before = probe.word(offset);
        assert_eq!(before, 537);

        let err = lb.pid().set_ki(id, -0.1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameterValue);
        assert_eq!(probe.word(offset), before);
    }
    Ok(())
}

#[test]
fn test_negative_kp_leaves_register_unchanged() -> LockboxResult<()> {
    let lb = lockbox();
    let id = LoopId::new(2, 2)?;
    lb.pid().set_kp(id, 3.0)?;

    let err = lb.pid().set_kp(id, -3.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameterValue);
    assert_eq!(lb.pid().kp(id)?, 3.0);
    Ok(())
}

#[test]
fn test_gains_saturate_at_24_bits() -> LockboxResult<()> {
    let lb = lockbox();
    let id = LoopId::new(1, 1)?;
    lb.pid().set_kp(id, 1e9)?;
    lb.pid().set_ki(id, 1e12)?;
    assert_eq!(lb.pid().kp(id)?, f64::from(0xFF_FFFFu32) / 4096.0);
    assert!(lb.pid().ki(id)? > 7.8e6);
    Ok(())
}

#[test]
fn test_feature_flag_changes_exactly_one_bit() -> LockboxResult<()> {
    let lb = lockbox();
    let pid = lb.pid();

    // Start from a busy word so cleared bits are checked too.
    for id in LoopId::ALL {
        pid.set_features(id, LoopFeatures::INVERTED | LoopFeatures::INTEGRATOR_HOLD)?;
    }

    for id in LoopId::ALL {
        for feature in Feature::ALL {
            for enabled in [true, false, true] {
                let before = pid.conf_word()?;
                pid.set_feature(id, feature, enabled)?;
                let after = pid.conf_word()?;
                let diff = before ^ after;
                let now = pid.feature(id, feature)?;
                assert_eq!(now, enabled, "{id} {feature:?}");
                assert!(diff == 0 || diff.count_ones() == 1, "{id} {feature:?} diff {diff:#x}");
                assert_eq!(diff & !lockbox_hal::pid::feature_bit(id, feature), 0);
            }
        }
    }
    Ok(())
}

#[test]
fn test_loop_11_flag_does_not_touch_other_loops() -> LockboxResult<()> {
    let lb = lockbox();
    let pid11 = LoopId::new(1, 1)?;

    let before = lb.pid().conf_word()?;
    lb.pid().set_integrator_reset(pid11, true)?;
    let after = lb.pid().conf_word()?;

    assert_eq!((before ^ after).count_ones(), 1);
    for other in LoopId::ALL.into_iter().filter(|&id| id != pid11) {
        assert!(!lb.pid().integrator_reset(other)?);
    }
    Ok(())
}

#[test]
fn test_concurrent_flag_setters_do_not_lose_updates() -> LockboxResult<()> {
    const ROUNDS: usize = 2000;
    let lb = Arc::new(lockbox());
    let barrier = Arc::new(Barrier::new(2));

    let jobs = [
        (LoopId::new(1, 1)?, Feature::Relock),
        (LoopId::new(2, 2)?, Feature::Inverted),
    ];

    let handles: Vec<_> = jobs
        .into_iter()
        .map(|(id, feature)| {
            let lb = Arc::clone(&lb);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || -> LockboxResult<()> {
                barrier.wait();
                for i in 0..ROUNDS {
                    // Toggle hard, always ending with the flag set.
                    lb.pid().set_feature(id, feature, i % 2 == 1 || i == ROUNDS - 1)?;
                }
                lb.pid().set_feature(id, feature, true)
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("setter thread panicked")?;
    }

    for (id, feature) in jobs {
        assert!(lb.pid().feature(id, feature)?, "{id} {feature:?} lost");
    }
    assert_eq!(lb.pid().conf_word()?.count_ones(), 2);
    Ok(())
}

#[test]
fn test_relock_input_rejects_bad_pins_and_keeps_value() -> LockboxResult<()> {
    let (lb, probe) = probed_lockbox();
    let id = LoopId::new(1, 2)?;
    lb.pid().set_relock_input(id, AnalogPin::Ain1)?;
    let offset = PID_RELOCK_INPUT_OFFSET + id.slot() * WORD_SIZE;
    assert_eq!(probe.word(offset), 1);

    for pin_id in [0, 3, 8, 42] {
        let err = lb.pid().set_relock_input_id(id, pin_id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange, "pin id {pin_id}");
        assert_eq!(probe.word(offset), 1);
    }
    assert_eq!(lb.pid().relock_input(id)?, AnalogPin::Ain1);
    Ok(())
}

#[test]
fn test_invalid_loop_identity_is_out_of_range() {
    for (input, output) in [(0, 1), (1, 0), (3, 1), (1, 3), (0, 0)] {
        let err = LoopId::new(input, output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }
}

#[test]
fn test_limits_are_independent_per_channel() -> LockboxResult<()> {
    let lb = lockbox();
    lb.limit().set_min(Channel::Ch1, 0.1)?;
    lb.limit().set_max(Channel::Ch1, 0.9)?;
    lb.limit().set_min(Channel::Ch2, 0.8)?;
    lb.limit().set_max(Channel::Ch2, 0.2)?;

    assert!((lb.limit().min(Channel::Ch1)? - 0.1).abs() < 1e-4);
    assert!((lb.limit().max(Channel::Ch1)? - 0.9).abs() < 1e-4);
    // min > max is left to the operator
    assert!(lb.limit().min(Channel::Ch2)? > lb.limit().max(Channel::Ch2)?);
    Ok(())
}

#[test]
fn test_limit_saturates_above_full_scale() -> LockboxResult<()> {
    let lb = lockbox();
    lb.limit().set_max(Channel::Ch2, 5.0)?;
    assert_eq!(lb.limit().max(Channel::Ch2)?, f64::from(0x3FFFu32) / 16384.0);
    Ok(())
}
