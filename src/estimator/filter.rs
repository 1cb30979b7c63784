//! Sample validity gating for calibration updates.
//!
//! Mount angles can only be observed well when the vehicle is driving
//! straight and fast: at low speed the translation direction is poorly
//! conditioned, and during turns lateral acceleration couples into the
//! apparent translation. The filter admits a sample only when both the
//! wheel-speed signal and the odometry's own forward rate clear the speed
//! threshold and the yaw rate is below the turn threshold.
//!
//! Rejection is a silent normal-path outcome: a rejected sample leaves all
//! estimator state, including block progress, untouched.

use serde::{Deserialize, Serialize};

use crate::core::types::OdometrySample;

const MPH_TO_MS: f64 = 0.44704;

/// Configuration for the sample filter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleFilterConfig {
    /// Minimum vehicle speed (m/s) for both the speed signal and the
    /// odometry forward rate.
    ///
    /// Default: 15 mph in m/s.
    #[serde(default = "default_min_speed")]
    pub min_speed: f64,

    /// Maximum absolute yaw rate (rad/s); samples at or above are rejected.
    ///
    /// Default: 2 degrees per second.
    #[serde(default = "default_max_yaw_rate")]
    pub max_yaw_rate: f64,
}

fn default_min_speed() -> f64 {
    15.0 * MPH_TO_MS
}
fn default_max_yaw_rate() -> f64 {
    2.0_f64.to_radians()
}

impl Default for SampleFilterConfig {
    fn default() -> Self {
        Self {
            min_speed: default_min_speed(),
            max_yaw_rate: default_max_yaw_rate(),
        }
    }
}

/// Validity gate with accept/reject accounting.
#[derive(Clone, Debug)]
pub struct SampleFilter {
    config: SampleFilterConfig,
    accepted: u64,
    rejected: u64,
}

impl SampleFilter {
    /// Create a new filter with the given configuration.
    pub fn new(config: SampleFilterConfig) -> Self {
        Self {
            config,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Decide whether one sample is usable for calibration.
    ///
    /// Rejects when:
    /// - any component of the sample (or the speed) is not finite,
    /// - the vehicle speed is below `min_speed`,
    /// - the odometry forward rate `trans[0]` is below `min_speed`,
    /// - `|rot[2]|` is at or above `max_yaw_rate`.
    pub fn admit(&mut self, v_ego: f64, sample: &OdometrySample) -> bool {
        let ok = v_ego.is_finite()
            && sample.is_finite()
            && v_ego >= self.config.min_speed
            && sample.trans[0] >= self.config.min_speed
            && sample.rot[2].abs() < self.config.max_yaw_rate;

        if ok {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
        ok
    }

    /// Number of samples admitted so far.
    #[inline]
    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    /// Number of samples rejected so far.
    #[inline]
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Reset the counters.
    pub fn reset(&mut self) {
        self.accepted = 0;
        self.rejected = 0;
    }
}
