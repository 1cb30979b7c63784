//! Online mount-angle estimation from speed and visual odometry.
//!
//! The calibrator consumes vehicle speed and visual-odometry samples and
//! maintains the camera-to-vehicle mounting angles (roll, pitch, yaw).
//! Each accepted sample yields an observation of the residual misalignment
//! between the odometry translation direction and the vehicle's forward
//! axis, composed onto the current estimate. Observations are reduced
//! block-wise; completed blocks feed an incremental mean whose window
//! saturates at `inputs_wanted` blocks.
//!
//! # Status State Machine
//!
//! ```text
//! ┌──────────────┐  valid_blocks >= inputs_needed   ┌────────────┐
//! │ Uncalibrated │ ───────────────────────────────▶ │ Calibrated │
//! └──────┬───────┘                                  └─────┬──────┘
//!        │ block deviates                                 │ block deviates
//!        │ > max_block_deviation                          │ > max_block_deviation
//!        ▼                                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Recalibrating                                               │
//! │   old_rpy <- pre-reset smoothed estimate, weight <- 1       │
//! │   rpy <- triggering block, valid_blocks <- 1                │
//! └───────────────┬─────────────────────────────────────────────┘
//!                 │ valid_blocks >= inputs_needed
//!                 ▼
//!            Calibrated
//! ```
//!
//! After any recalibration reset the published estimate blends from the old
//! value to the newly accumulated one over `smooth_cycles` completed blocks,
//! so downstream consumers never see a step discontinuity.
//!
//! # Example
//!
//! ```rust,ignore
//! use drishti_calib::{CalibratorConfig, MountCalibrator};
//!
//! let mut calibrator = MountCalibrator::new(CalibratorConfig::default());
//!
//! // On message arrival (caller serializes the two streams):
//! calibrator.update_speed(v_ego);
//! calibrator.update_odometry(trans, rot, trans_std);
//!
//! let rpy = calibrator.smoothed_rpy();
//! let status = calibrator.cal_status();
//! ```

use serde::{Deserialize, Serialize};

use crate::core::math::compose_euler;
use crate::core::types::{CalStatus, CalibrationParams, LiveCalibration, OdometrySample};
use crate::estimator::block::{BlockAccumulator, BlockEstimate};
use crate::estimator::filter::{SampleFilter, SampleFilterConfig};
use crate::store::ParamStore;

/// Storage key for the persisted calibration.
pub const CALIBRATION_PARAMS_KEY: &str = "CalibrationParams";

// Pitch and yaw ranges the downstream model frame can accommodate.
// Observations are clamped just outside these limits.
const PITCH_LIMITS: [f64; 2] = [-0.09074112085129739, 0.14907572052989657];
const YAW_LIMITS: [f64; 2] = [-0.06912048084718224, 0.06912048084718235];
const CLIP_MARGIN: f64 = 0.005;

/// Configuration for the mount calibrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibratorConfig {
    /// Sample validity gate settings.
    #[serde(default)]
    pub filter: SampleFilterConfig,

    /// Accepted samples aggregated into one block estimate.
    ///
    /// Default: 100
    #[serde(default = "default_block_size")]
    pub block_size: u32,

    /// Minimum valid blocks for Calibrated status.
    ///
    /// Default: 5
    #[serde(default = "default_inputs_needed")]
    pub inputs_needed: u32,

    /// Valid-block count representing full confidence; also the saturation
    /// window of the block mean.
    ///
    /// Default: 50
    #[serde(default = "default_inputs_wanted")]
    pub inputs_wanted: u32,

    /// Completed blocks over which the published estimate transitions from
    /// the pre-reset value to freshly accumulated data.
    ///
    /// Default: 4
    #[serde(default = "default_smooth_cycles")]
    pub smooth_cycles: f64,

    /// Block-mean lateral-velocity angle uncertainty (radians) at or above
    /// which a block cannot raise `valid_blocks` past `inputs_needed`.
    ///
    /// Default: 0.25 degrees
    #[serde(default = "default_max_vel_angle_std")]
    pub max_vel_angle_std: f64,

    /// Deviation (radians, Euclidean norm over the three angles) between a
    /// completed block and the current estimate that triggers
    /// recalibration.
    ///
    /// Default: 2 degrees
    #[serde(default = "default_max_block_deviation")]
    pub max_block_deviation: f64,
}

fn default_block_size() -> u32 {
    100
}
fn default_inputs_needed() -> u32 {
    5
}
fn default_inputs_wanted() -> u32 {
    50
}
fn default_smooth_cycles() -> f64 {
    4.0
}
fn default_max_vel_angle_std() -> f64 {
    0.25_f64.to_radians()
}
fn default_max_block_deviation() -> f64 {
    2.0_f64.to_radians()
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            filter: SampleFilterConfig::default(),
            block_size: default_block_size(),
            inputs_needed: default_inputs_needed(),
            inputs_wanted: default_inputs_wanted(),
            smooth_cycles: default_smooth_cycles(),
            max_vel_angle_std: default_max_vel_angle_std(),
            max_block_deviation: default_max_block_deviation(),
        }
    }
}

/// Online estimator for the camera mounting angles.
pub struct MountCalibrator {
    config: CalibratorConfig,
    filter: SampleFilter,
    block: BlockAccumulator,

    /// Mean of integrated block estimates, radians.
    rpy: [f64; 3],
    /// Accepted block count, bounded by `inputs_wanted`.
    valid_blocks: u32,
    /// Blend anchor retained across a recalibration reset.
    old_rpy: [f64; 3],
    /// Weight of `old_rpy` in the published estimate, in [0, 1].
    old_rpy_weight: f64,
    cal_status: CalStatus,
    /// Most recent vehicle speed, m/s.
    v_ego: f64,

    store: Option<Box<dyn ParamStore>>,
}

impl MountCalibrator {
    /// Create a calibrator starting from the zeroed default state.
    pub fn new(config: CalibratorConfig) -> Self {
        Self {
            filter: SampleFilter::new(config.filter.clone()),
            block: BlockAccumulator::new(config.block_size),
            rpy: [0.0; 3],
            valid_blocks: 0,
            old_rpy: [0.0; 3],
            old_rpy_weight: 0.0,
            cal_status: CalStatus::Uncalibrated,
            v_ego: 0.0,
            store: None,
            config,
        }
    }

    /// Create a calibrator warm-started from `store`, which also receives
    /// a checkpoint after every completed block.
    ///
    /// Absent or malformed stored data falls back to the zeroed default
    /// without error.
    pub fn with_store(config: CalibratorConfig, store: Box<dyn ParamStore>) -> Self {
        let mut calibrator = Self::new(config);
        calibrator.store = Some(store);
        calibrator.warm_start();
        calibrator
    }

    fn warm_start(&mut self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let Some(bytes) = store.get(CALIBRATION_PARAMS_KEY) else {
            return;
        };
        match serde_json::from_slice::<CalibrationParams>(&bytes) {
            Ok(params) if params.rpy_calib.iter().all(|v| v.is_finite()) => {
                self.rpy = params.rpy_calib;
                self.valid_blocks = params.valid_blocks.min(self.config.inputs_wanted);
                self.update_status();
            }
            Ok(_) => {
                log::warn!("stored calibration is not finite, starting from default");
            }
            Err(e) => {
                log::warn!("could not parse stored calibration: {e}");
            }
        }
    }

    /// Feed one vehicle speed sample (m/s).
    pub fn update_speed(&mut self, speed: f64) {
        self.v_ego = speed;
    }

    /// Feed one visual-odometry sample.
    ///
    /// Returns the per-sample mount observation when the sample was
    /// accepted, `None` when it was filtered out. Never fails: malformed
    /// numeric input is filtered, not reported.
    pub fn update_odometry(
        &mut self,
        trans: [f64; 3],
        rot: [f64; 3],
        trans_std: [f64; 3],
    ) -> Option<[f64; 3]> {
        let sample = OdometrySample {
            trans,
            rot,
            trans_std,
        };
        if !self.filter.admit(self.v_ego, &sample) {
            return None;
        }

        // Misalignment of the odometry translation direction relative to
        // the vehicle's forward axis, seen in the currently calibrated
        // frame.
        let observed = [
            0.0,
            -trans[2].atan2(trans[0]),
            trans[1].atan2(trans[0]),
        ];
        let new_rpy = sanity_clip(compose_euler(self.smoothed_rpy(), observed));
        let angle_std = trans_std[1].atan2(trans[0]);

        if let Some(estimate) = self.block.add(new_rpy, angle_std) {
            self.integrate_block(estimate);
        }
        Some(new_rpy)
    }

    fn integrate_block(&mut self, estimate: BlockEstimate) {
        self.old_rpy_weight = (self.old_rpy_weight - 1.0 / self.config.smooth_cycles).max(0.0);

        let deviation = distance(estimate.rpy, self.rpy);
        let drifted = self.valid_blocks > 0
            && self.cal_status != CalStatus::Recalibrating
            && deviation > self.config.max_block_deviation;

        if drifted {
            // The stored calibration no longer matches what the vehicle
            // reports. Keep the published value anchored at the pre-reset
            // estimate and rebuild from the block that exposed the drift.
            let anchor = self.smoothed_rpy();
            self.rpy = estimate.rpy;
            self.valid_blocks = 1;
            self.old_rpy = anchor;
            self.old_rpy_weight = 1.0;
            self.cal_status = CalStatus::Recalibrating;
            log::info!(
                "mount drift detected ({:.4} rad), recalibrating from [{:.4}, {:.4}, {:.4}]",
                deviation,
                anchor[0],
                anchor[1],
                anchor[2]
            );
        } else {
            let n = f64::from(self.valid_blocks);
            for (current, new) in self.rpy.iter_mut().zip(estimate.rpy) {
                *current = (n * *current + new) / (n + 1.0);
            }

            // A block collected under high translation uncertainty still
            // counts toward a usable calibration but cannot raise the
            // confidence level past the minimum.
            let cap = if estimate.angle_std >= self.config.max_vel_angle_std {
                self.valid_blocks.max(self.config.inputs_needed)
            } else {
                self.config.inputs_wanted
            };
            self.valid_blocks = (self.valid_blocks + 1).min(cap);
            self.update_status();
        }

        debug_assert!(self.valid_blocks <= self.config.inputs_wanted);
        self.checkpoint();
    }

    fn update_status(&mut self) {
        if self.valid_blocks >= self.config.inputs_needed {
            self.cal_status = CalStatus::Calibrated;
        } else if self.cal_status != CalStatus::Recalibrating {
            self.cal_status = CalStatus::Uncalibrated;
        }
    }

    fn checkpoint(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let params = CalibrationParams {
            rpy_calib: self.rpy,
            valid_blocks: self.valid_blocks,
        };
        match serde_json::to_vec(&params) {
            Ok(bytes) => {
                if let Err(e) = store.put(CALIBRATION_PARAMS_KEY, &bytes) {
                    log::warn!("calibration checkpoint write failed: {e}");
                }
            }
            Err(e) => log::warn!("calibration checkpoint serialization failed: {e}"),
        }
    }

    /// Return the estimator to the zeroed default state.
    ///
    /// Idempotent; the result is indistinguishable from a freshly
    /// constructed, non-warm-started instance.
    pub fn reset(&mut self) {
        self.rpy = [0.0; 3];
        self.valid_blocks = 0;
        self.old_rpy = [0.0; 3];
        self.old_rpy_weight = 0.0;
        self.cal_status = CalStatus::Uncalibrated;
        self.v_ego = 0.0;
        self.block.reset();
        self.filter.reset();
    }

    /// Current best-estimate [roll, pitch, yaw], radians.
    #[inline]
    pub fn rpy(&self) -> [f64; 3] {
        self.rpy
    }

    /// Published estimate: blends the pre-reset value with `rpy` while the
    /// blend weight is non-zero.
    pub fn smoothed_rpy(&self) -> [f64; 3] {
        if self.old_rpy_weight > 0.0 {
            let w = self.old_rpy_weight;
            [
                w * self.old_rpy[0] + (1.0 - w) * self.rpy[0],
                w * self.old_rpy[1] + (1.0 - w) * self.rpy[1],
                w * self.old_rpy[2] + (1.0 - w) * self.rpy[2],
            ]
        } else {
            self.rpy
        }
    }

    /// Number of accepted blocks, bounded by `inputs_wanted`.
    #[inline]
    pub fn valid_blocks(&self) -> u32 {
        self.valid_blocks
    }

    /// Current confidence state.
    #[inline]
    pub fn cal_status(&self) -> CalStatus {
        self.cal_status
    }

    /// Weight of the pre-reset estimate in the published value.
    #[inline]
    pub fn old_rpy_weight(&self) -> f64 {
        self.old_rpy_weight
    }

    /// Samples accumulated in the currently open block.
    #[inline]
    pub fn block_progress(&self) -> u32 {
        self.block.progress()
    }

    /// Progress toward a usable calibration, 0-100.
    pub fn progress_percent(&self) -> u8 {
        let collected = u64::from(self.valid_blocks) * u64::from(self.config.block_size)
            + u64::from(self.block.progress());
        let needed = u64::from(self.config.inputs_needed) * u64::from(self.config.block_size);
        (collected * 100 / needed.max(1)).min(100) as u8
    }

    /// Samples admitted by the validity gate.
    #[inline]
    pub fn accepted_samples(&self) -> u64 {
        self.filter.accepted_count()
    }

    /// Samples rejected by the validity gate.
    #[inline]
    pub fn rejected_samples(&self) -> u64 {
        self.filter.rejected_count()
    }

    /// Snapshot of the published calibration message.
    pub fn live_calibration(&self) -> LiveCalibration {
        LiveCalibration {
            rpy_calib: self.smoothed_rpy(),
            valid_blocks: self.valid_blocks,
            cal_status: self.cal_status,
            progress_percent: self.progress_percent(),
        }
    }

    /// Active configuration.
    #[inline]
    pub fn config(&self) -> &CalibratorConfig {
        &self.config
    }
}

/// Clamp an observation into the range the model frame can accommodate.
///
/// NaN (from degenerate input that slipped past the gate) falls back to
/// the zeroed default rather than poisoning the block sums.
fn sanity_clip(rpy: [f64; 3]) -> [f64; 3] {
    if rpy.iter().any(|v| v.is_nan()) {
        return [0.0; 3];
    }
    [
        rpy[0],
        rpy[1].clamp(PITCH_LIMITS[0] - CLIP_MARGIN, PITCH_LIMITS[1] + CLIP_MARGIN),
        rpy[2].clamp(YAW_LIMITS[0] - CLIP_MARGIN, YAW_LIMITS[1] + CLIP_MARGIN),
    ]
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
