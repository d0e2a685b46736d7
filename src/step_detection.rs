//! Step Detection Module.
//!
//! Counts steps from raw accelerometer magnitude using:
//! - Gravity removal on the vector magnitude (orientation-invariant)
//! - Kalman-lite smoothing of the motion signal
//! - Falling-edge threshold crossing (zero-crossing-on-descent)
//! - Minimum inter-step interval debounce
//!
//! Distance and calories are derived from the step count with fixed,
//! uncalibrated constants. Speed comes from a rolling window of
//! `(timestamp, step_count)` pairs.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::error::{ensure_positive, ConfigError};
use crate::signal::{gravity_removed, KalmanFilter, MagnitudeHistory, STANDARD_GRAVITY};
use crate::types::{AccelSample, StepUpdate};

/// Configuration for step detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepDetectorConfig {
    /// Kalman process noise `q`.
    pub process_noise: f64,
    /// Kalman measurement noise `r`.
    pub measurement_noise: f64,
    /// Gravity subtracted from the raw magnitude (m/s²).
    pub gravity: f64,
    /// Filtered magnitude above which the signal counts as a footfall (m/s²).
    pub accel_threshold: f64,
    /// Minimum time between accepted steps in milliseconds.
    pub min_step_interval_ms: u64,
    /// Average stride in meters.
    pub step_length_m: f64,
    /// Flat calorie cost per step (kcal).
    pub calories_per_step: f64,
    /// Rolling window used for speed estimation in milliseconds.
    pub speed_window_ms: u64,
    /// Number of filtered magnitudes kept for activity statistics.
    pub magnitude_history: usize,
}

impl Default for StepDetectorConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.5,
            measurement_noise: 1.0,
            gravity: STANDARD_GRAVITY,
            accel_threshold: 1.2,
            min_step_interval_ms: 280, // Brisk running cadence limit
            step_length_m: 0.72,       // Average adult stride
            calories_per_step: 0.04,
            speed_window_ms: 5000,
            magnitude_history: 100, // ~2s at 50Hz
        }
    }
}

impl StepDetectorConfig {
    /// Check every parameter for a meaningful range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("process_noise", self.process_noise)?;
        ensure_positive("measurement_noise", self.measurement_noise)?;
        ensure_positive("gravity", self.gravity)?;
        ensure_positive("accel_threshold", self.accel_threshold)?;
        ensure_positive("step_length_m", self.step_length_m)?;
        if !(self.calories_per_step.is_finite() && self.calories_per_step >= 0.0) {
            return Err(ConfigError::invalid(
                "calories_per_step",
                format!("must be finite and >= 0, got {}", self.calories_per_step),
            ));
        }
        if self.speed_window_ms == 0 {
            return Err(ConfigError::invalid("speed_window_ms", "must be > 0"));
        }
        if self.magnitude_history == 0 {
            return Err(ConfigError::invalid("magnitude_history", "must be > 0"));
        }
        Ok(())
    }
}

/// Step detector over a stream of accelerometer samples.
///
/// One instance per tracked session. Not internally synchronized: the caller
/// feeds samples from a single stream in timestamp order.
#[derive(Debug, Clone)]
pub struct StepDetector {
    config: StepDetectorConfig,

    // Filtering state
    filter: KalmanFilter,
    magnitudes: MagnitudeHistory,
    was_above_threshold: bool,

    // Step timing
    steps: u64,
    last_step_ms: Option<u64>,
    last_sample_ms: Option<u64>,

    // Speed estimation: (timestamp_ms, step_count)
    speed_window: VecDeque<(u64, u64)>,
    speed_kmh: f64,

    // Diagnostics
    dropped_samples: u64,
}

impl StepDetector {
    /// Create a new step detector with the given configuration.
    pub fn new(config: StepDetectorConfig) -> Self {
        Self {
            filter: KalmanFilter::new(config.process_noise, config.measurement_noise),
            magnitudes: MagnitudeHistory::new(config.magnitude_history),
            was_above_threshold: false,
            steps: 0,
            last_step_ms: None,
            last_sample_ms: None,
            speed_window: VecDeque::new(),
            speed_kmh: 0.0,
            dropped_samples: 0,
            config,
        }
    }

    /// Create a step detector after validating the configuration.
    pub fn try_new(config: StepDetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Process a single accelerometer sample.
    ///
    /// Returns a `StepUpdate` only when a step is accepted. Malformed or
    /// out-of-order samples are dropped without advancing the filter.
    pub fn ingest(&mut self, sample: &AccelSample) -> Option<StepUpdate> {
        if !sample.is_valid() {
            self.dropped_samples += 1;
            debug!(timestamp_ms = sample.timestamp_ms, "dropping malformed accel sample");
            return None;
        }
        if self
            .last_sample_ms
            .is_some_and(|last| sample.timestamp_ms < last)
        {
            self.dropped_samples += 1;
            debug!(timestamp_ms = sample.timestamp_ms, "dropping out-of-order accel sample");
            return None;
        }
        self.last_sample_ms = Some(sample.timestamp_ms);

        let motion = gravity_removed(sample.magnitude(), self.config.gravity);
        let filtered = self.filter.update(motion);
        self.magnitudes.push(filtered);

        let is_above = filtered > self.config.accel_threshold;
        let falling_edge = self.was_above_threshold && !is_above;
        self.was_above_threshold = is_above;

        if !falling_edge {
            return None;
        }

        if let Some(last) = self.last_step_ms {
            let interval = sample.timestamp_ms.saturating_sub(last);
            if interval < self.config.min_step_interval_ms {
                debug!(interval_ms = interval, "step candidate rejected by debounce");
                return None;
            }
        }

        Some(self.accept_step(sample.timestamp_ms))
    }

    /// Process a batch of samples and return every accepted step.
    pub fn process_batch(&mut self, samples: &[AccelSample]) -> Vec<StepUpdate> {
        samples.iter().filter_map(|s| self.ingest(s)).collect()
    }

    /// Total steps since the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Distance derived from the step count (m).
    pub fn distance_m(&self) -> f64 {
        self.steps as f64 * self.config.step_length_m
    }

    /// Calorie estimate derived from the step count (kcal).
    pub fn calories(&self) -> f64 {
        self.steps as f64 * self.config.calories_per_step
    }

    /// Speed as of the last accepted step (km/h).
    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    /// Variance of recent filtered magnitudes.
    pub fn signal_variance(&self) -> f64 {
        self.magnitudes.variance()
    }

    /// True when the recent filtered signal averages above half the step threshold.
    pub fn is_moving(&self) -> bool {
        !self.magnitudes.is_empty() && self.magnitudes.mean() > self.config.accel_threshold * 0.5
    }

    /// Number of samples dropped as malformed or out of order.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Active configuration.
    pub fn config(&self) -> &StepDetectorConfig {
        &self.config
    }

    /// Zero every field and clear both buffers. Idempotent.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.magnitudes.clear();
        self.was_above_threshold = false;
        self.steps = 0;
        self.last_step_ms = None;
        self.last_sample_ms = None;
        self.speed_window.clear();
        self.speed_kmh = 0.0;
        self.dropped_samples = 0;
    }

    #[cfg(test)]
    pub(crate) fn speed_window_len(&self) -> usize {
        self.speed_window.len()
    }

    #[cfg(test)]
    pub(crate) fn history_len(&self) -> usize {
        self.magnitudes.len()
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    fn accept_step(&mut self, timestamp_ms: u64) -> StepUpdate {
        self.steps += 1;
        self.last_step_ms = Some(timestamp_ms);
        self.update_speed(timestamp_ms);

        trace!(steps = self.steps, timestamp_ms, "step accepted");

        StepUpdate {
            timestamp_ms,
            steps: self.steps,
            distance_m: self.distance_m(),
            calories: self.calories(),
            speed_kmh: self.speed_kmh,
        }
    }

    fn update_speed(&mut self, timestamp_ms: u64) {
        self.speed_window.push_back((timestamp_ms, self.steps));

        let horizon = timestamp_ms.saturating_sub(self.config.speed_window_ms);
        while self
            .speed_window
            .front()
            .is_some_and(|&(t, _)| t < horizon)
        {
            self.speed_window.pop_front();
        }

        self.speed_kmh = match (self.speed_window.front(), self.speed_window.back()) {
            (Some(&(t0, s0)), Some(&(t1, s1))) if t1 > t0 => {
                let elapsed_s = (t1 - t0) as f64 / 1000.0;
                let meters = (s1 - s0) as f64 * self.config.step_length_m;
                meters / elapsed_s * 3.6
            }
            _ => 0.0,
        };
    }
}

impl Default for StepDetector {
    fn default() -> Self {
        Self::new(StepDetectorConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
