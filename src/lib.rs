//! drishti-calib - Online camera mount calibration for vehicle pipelines
//!
//! Continuously derives the camera-to-vehicle mounting angles (roll, pitch,
//! yaw) from a stream of vehicle-speed readings and visual-odometry
//! estimates, and exposes a validated calibration plus a confidence status
//! for downstream perception and planning.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      bin/                           │  ← Replay daemon
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Sample logs
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │              estimator/        store/               │  ← Calibrator +
//! │      (filter, block, calibrator) (params)           │    persistence
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (math, types)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! The estimator is single-threaded and call-driven; the host invokes the
//! two ingestion operations on message arrival and reads the current state
//! whenever it publishes:
//!
//! ```
//! use drishti_calib::{CalibratorConfig, MountCalibrator};
//!
//! let mut calibrator = MountCalibrator::new(CalibratorConfig::default());
//! calibrator.update_speed(13.0);
//! calibrator.update_odometry([13.0, 0.0, 0.0], [0.0; 3], [0.05; 3]);
//!
//! let live = calibrator.live_calibration();
//! assert_eq!(live.valid_blocks, 0);
//! ```

// Layer 1: Core foundation (no internal deps)
pub mod core;

// Layer 2: Estimator and persistence (depend on core)
pub mod estimator;
pub mod store;

// Layer 3: I/O infrastructure
pub mod io;

pub mod error;

// Convenience re-exports (flat namespace for common use)
pub use core::math;
pub use core::types::{CalStatus, CalibrationParams, LiveCalibration, OdometrySample};
pub use error::{Error, Result};
pub use estimator::{
    BlockAccumulator, BlockEstimate, CALIBRATION_PARAMS_KEY, CalibratorConfig, MountCalibrator,
    SampleFilter, SampleFilterConfig,
};
pub use io::{SampleLogReader, SampleLogWriter, SampleRecord};
pub use store::{FileStore, MemoryStore, ParamStore};
