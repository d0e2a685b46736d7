//! Core data types for the motion fusion engine.
//!
//! Inputs (`AccelSample`, `GeoFix`) are ephemeral: estimators fold them into
//! their own filter state and never retain the raw stream. Outputs
//! (`StepUpdate`, `DistanceUpdate`, `SleepUpdate`) are plain values handed to
//! whatever layer persists or renders them.
//!
//! Design principle: if a concept crosses a module boundary it gets a type.
//! No raw tuples in public signatures.

use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single raw accelerometer sample in the device frame, gravity included.
///
/// Timestamps are monotonic milliseconds. Callers must deliver samples in
/// non-decreasing timestamp order per estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccelSample {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// X axis in m/s².
    pub x: f64,
    /// Y axis in m/s².
    pub y: f64,
    /// Z axis in m/s².
    pub z: f64,
}

impl AccelSample {
    /// Creates a new sample.
    pub fn new(timestamp_ms: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            z,
        }
    }

    /// True when every axis holds a finite value.
    ///
    /// Non-finite axes stand in for "missing" readings from the sensor source.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Vector magnitude `sqrt(x² + y² + z²)` in m/s².
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A position fix from an external location provider.
///
/// Fixes arrive at irregular, provider-determined intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoFix {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
}

impl GeoFix {
    /// Creates a new fix.
    pub fn new(timestamp_ms: u64, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp_ms,
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Emitted by the step detector on every accepted step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepUpdate {
    /// Timestamp of the sample that completed the step (ms).
    pub timestamp_ms: u64,
    /// Running step count since the last reset.
    pub steps: u64,
    /// Distance derived from `steps * step_length_m`.
    pub distance_m: f64,
    /// Flat per-step calorie estimate (kcal).
    pub calories: f64,
    /// Walking speed over the rolling speed window (km/h).
    pub speed_kmh: f64,
}

/// Emitted by the distance tracker whenever a fix clears the noise gate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceUpdate {
    /// Timestamp of the accepted fix (ms).
    pub timestamp_ms: u64,
    /// Cumulative great-circle distance since tracking started (km).
    pub total_distance_km: f64,
    /// Speed between the previous and the new accepted fix (km/h).
    pub speed_kmh: f64,
}

/// Sleep/wake state of the sleep inferencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SleepState {
    /// Initial state. Motion resets the stillness clock.
    Awake,
    /// Motionless long enough inside the night window.
    Asleep,
}

/// Emitted by the sleep inferencer on a state transition.
///
/// This is a best-effort heuristic over accelerometer stillness, not a
/// validated sleep-stage detector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SleepUpdate {
    /// Awake → Asleep. `sleep_start` is backdated to the end of the
    /// motionless qualification period, not the time of detection.
    FellAsleep {
        /// Inferred sleep onset.
        sleep_start: NaiveDateTime,
    },
    /// Asleep → Awake for an interval that met the minimum duration.
    WokeUp {
        /// Inferred sleep onset.
        sleep_start: NaiveDateTime,
        /// Time of the first qualifying motion.
        woke_at: NaiveDateTime,
        /// Estimated sleep duration in hours, measured from the last motion
        /// before sleep.
        duration_hours: f64,
    },
}

impl SleepUpdate {
    /// Sleep duration in hours for completed intervals.
    pub fn duration_hours(&self) -> Option<f64> {
        match self {
            SleepUpdate::FellAsleep { .. } => None,
            SleepUpdate::WokeUp { duration_hours, .. } => Some(*duration_hours),
        }
    }

    /// Inferred sleep onset carried by either variant.
    pub fn sleep_start(&self) -> NaiveDateTime {
        match self {
            SleepUpdate::FellAsleep { sleep_start } => *sleep_start,
            SleepUpdate::WokeUp { sleep_start, .. } => *sleep_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_accel_magnitude() {
        let sample = AccelSample::new(0, 3.0, 4.0, 0.0);
        assert_relative_eq!(sample.magnitude(), 5.0);
    }

    #[test]
    fn test_accel_validity() {
        assert!(AccelSample::new(0, 0.0, 0.0, 9.81).is_valid());
        assert!(!AccelSample::new(0, f64::NAN, 0.0, 9.81).is_valid());
        assert!(!AccelSample::new(0, 0.0, f64::INFINITY, 9.81).is_valid());
    }

    #[test]
    fn test_geofix_validity() {
        assert!(GeoFix::new(0, 37.56, 126.97).is_valid());
        assert!(!GeoFix::new(0, 91.0, 0.0).is_valid());
        assert!(!GeoFix::new(0, 0.0, -180.5).is_valid());
        assert!(!GeoFix::new(0, f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_sleep_update_accessors() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let woke = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap();

        let fell = SleepUpdate::FellAsleep { sleep_start: start };
        assert_eq!(fell.duration_hours(), None);
        assert_eq!(fell.sleep_start(), start);

        let done = SleepUpdate::WokeUp {
            sleep_start: start,
            woke_at: woke,
            duration_hours: 7.5,
        };
        assert_eq!(done.duration_hours(), Some(7.5));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_step_update_serde_roundtrip() {
        let update = StepUpdate {
            timestamp_ms: 1_000,
            steps: 12,
            distance_m: 8.64,
            calories: 0.48,
            speed_kmh: 4.2,
        };
        let json = serde_json::to_string(&update).unwrap();
        let parsed: StepUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, update);
    }
}
