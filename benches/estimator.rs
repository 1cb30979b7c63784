//! Benchmark the calibration ingestion path.

use criterion::{Criterion, criterion_group, criterion_main};
use drishti_calib::{CalibratorConfig, MountCalibrator};
use std::hint::black_box;

fn bench_update_odometry(c: &mut Criterion) {
    let config = CalibratorConfig::default();
    let speed = config.filter.min_speed + 1.0;

    c.bench_function("update_odometry_accepted", |b| {
        let mut calibrator = MountCalibrator::new(config.clone());
        calibrator.update_speed(speed);
        b.iter(|| {
            calibrator.update_odometry(
                black_box([speed, 0.001, -0.002]),
                black_box([0.0, 0.0, 0.0]),
                black_box([0.05, 0.05, 0.05]),
            )
        })
    });

    c.bench_function("update_odometry_rejected", |b| {
        let mut calibrator = MountCalibrator::new(config.clone());
        calibrator.update_speed(0.0);
        b.iter(|| {
            calibrator.update_odometry(
                black_box([speed, 0.001, -0.002]),
                black_box([0.0, 0.0, 0.0]),
                black_box([0.05, 0.05, 0.05]),
            )
        })
    });
}

criterion_group!(benches, bench_update_odometry);
criterion_main!(benches);
