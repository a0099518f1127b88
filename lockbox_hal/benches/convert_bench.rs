//! Conversion and register-window throughput

use criterion::{Criterion, criterion_group, criterion_main};
use lockbox_common::calibration::{CalibrationRecord, ChannelCalibration};
use lockbox_common::types::{Feature, LoopId};
use lockbox_hal::Lockbox;
use lockbox_hal::convert::{SETPOINT_SCALE, counts_to_volts, volts_to_counts};
use std::hint::black_box;

/// Benchmark the bare conversion functions
fn bench_conversions(c: &mut Criterion) {
    let cal = ChannelCalibration {
        gain: 0.998,
        offset: 0.002,
    };

    c.bench_function("volts_to_counts", |b| {
        b.iter(|| black_box(volts_to_counts(SETPOINT_SCALE, black_box(0.5), cal, 0.0)));
    });

    c.bench_function("counts_to_volts", |b| {
        b.iter(|| black_box(counts_to_volts(SETPOINT_SCALE, black_box(8192), cal, 0.0)));
    });
}

/// Benchmark full setter paths through the locked window
fn bench_setters(c: &mut Criterion) {
    let lockbox = Lockbox::simulated(CalibrationRecord::default());
    let id = LoopId::ALL[3];

    c.bench_function("set_setpoint", |b| {
        b.iter(|| lockbox.pid().set_setpoint(id, black_box(0.25)).unwrap());
    });

    c.bench_function("set_feature", |b| {
        b.iter(|| {
            lockbox
                .pid()
                .set_feature(id, Feature::Relock, black_box(true))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_conversions, bench_setters);
criterion_main!(benches);
