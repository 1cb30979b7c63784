//! Sample and message types shared across the crate.

use serde::{Deserialize, Serialize};

/// One visual-odometry sample in the vehicle frame.
///
/// Consumed immediately by the estimator; never stored beyond the open
/// block's running sums.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OdometrySample {
    /// Translation rate [x, y, z] in m/s (x forward, y left, z up).
    pub trans: [f64; 3],
    /// Rotation rate [roll, pitch, yaw] in rad/s.
    pub rot: [f64; 3],
    /// Translation rate standard deviation, same units as `trans`.
    pub trans_std: [f64; 3],
}

impl OdometrySample {
    /// True when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.trans.iter().all(|v| v.is_finite())
            && self.rot.iter().all(|v| v.is_finite())
            && self.trans_std.iter().all(|v| v.is_finite())
    }
}

/// Calibration confidence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalStatus {
    /// Not enough valid blocks accumulated yet.
    #[default]
    Uncalibrated,
    /// Enough valid blocks; estimate usable downstream.
    Calibrated,
    /// Drift detected; re-accumulating while blending from the old estimate.
    Recalibrating,
}

/// Published calibration message for downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCalibration {
    /// Smoothed roll/pitch/yaw mount angles, radians.
    pub rpy_calib: [f64; 3],
    /// Number of accepted calibration blocks.
    pub valid_blocks: u32,
    /// Current confidence state.
    pub cal_status: CalStatus,
    /// Progress toward a usable calibration, 0-100.
    pub progress_percent: u8,
}

/// Persisted calibration state, stored under a fixed key.
///
/// Field names are part of the storage contract shared with downstream
/// readers; keep them stable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationParams {
    /// Roll/pitch/yaw mount angles, radians.
    pub rpy_calib: [f64; 3],
    /// Number of accepted calibration blocks at checkpoint time.
    pub valid_blocks: u32,
}
