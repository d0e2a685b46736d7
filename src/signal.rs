//! Signal filtering primitives shared by the accelerometer estimators.
//!
//! This module provides:
//! - A single-state Kalman filter used to smooth the gravity-removed
//!   acceleration magnitude
//! - Gravity removal on the raw magnitude
//! - A bounded history of filtered magnitudes for activity statistics
//!
//! Design note: every operation is O(1) per sample with a fixed working set.
//! No allocation happens after construction.

use std::collections::VecDeque;

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Remove gravity from a raw acceleration magnitude.
///
/// The device frame is unknown, so only the magnitude is compared against
/// gravity: `|‖a‖ - g|`. The result is orientation-invariant.
pub fn gravity_removed(magnitude: f64, gravity: f64) -> f64 {
    (magnitude - gravity).abs()
}

/// Kalman-lite filter over a scalar signal.
///
/// Random-walk process model with a direct measurement. Each call to
/// [`update`](KalmanFilter::update) runs predict and correct in one step.
/// At the default noise settings the gain settles near 0.5, trading a
/// small fixed lag for strong jitter rejection.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    /// Process noise `q`.
    process_noise: f64,
    /// Measurement noise `r`.
    measurement_noise: f64,
    /// Error covariance `p`.
    error_covariance: f64,
    /// Current estimate `x`.
    estimate: f64,
    /// Last computed gain `k`.
    gain: f64,
}

impl KalmanFilter {
    /// Initial error covariance. One unit of uncertainty around a zero estimate.
    const INITIAL_COVARIANCE: f64 = 1.0;

    /// Create a filter with the given noise parameters.
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
            error_covariance: Self::INITIAL_COVARIANCE,
            estimate: 0.0,
            gain: 0.0,
        }
    }

    /// Fold one measurement into the estimate and return the new estimate.
    pub fn update(&mut self, measurement: f64) -> f64 {
        // Predict: x stays, p grows by q
        let predicted_covariance = self.error_covariance + self.process_noise;

        // Correct
        self.gain = predicted_covariance / (predicted_covariance + self.measurement_noise);
        self.estimate += self.gain * (measurement - self.estimate);
        self.error_covariance = (1.0 - self.gain) * predicted_covariance;

        self.estimate
    }

    /// Current estimate.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// Gain applied on the last update.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Current error covariance.
    pub fn error_covariance(&self) -> f64 {
        self.error_covariance
    }

    /// Return to the initial state, keeping the noise parameters.
    pub fn reset(&mut self) {
        self.error_covariance = Self::INITIAL_COVARIANCE;
        self.estimate = 0.0;
        self.gain = 0.0;
    }
}

/// Fixed-capacity history of recent filtered magnitudes.
///
/// Oldest values are evicted once capacity is reached.
#[derive(Debug, Clone)]
pub struct MagnitudeHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl MagnitudeHistory {
    /// Create an empty history holding at most `capacity` values.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest one when full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maximum number of stored values.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean of the stored values, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population variance of the stored values, 0 when fewer than two.
    pub fn variance(&self) -> f64 {
        if self.values.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        self.values
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / self.values.len() as f64
    }

    /// Drop every stored value.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
