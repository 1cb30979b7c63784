//! Foundation layer: rotation math and shared types.

pub mod math;
pub mod types;

pub use types::{CalStatus, CalibrationParams, LiveCalibration, OdometrySample};
