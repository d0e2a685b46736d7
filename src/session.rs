/// Tracking session composing the three estimators.
///
/// The estimators share no state and can be driven independently. This
/// module bundles one of each for the common case of a single tracked user
/// session, fanning accelerometer samples out to the step detector and the
/// sleep inferencer and routing position fixes to the distance tracker.
///
/// # Architecture
///
/// 1. **Start**: capability check for location, fresh estimator state
/// 2. **Ingest**: accelerometer samples and fixes, each in timestamp order
/// 3. **Poll**: once-a-minute wall-clock tick for sleep inference
/// 4. **Stop / Reset**: cease tracking, or zero every estimator
///
/// Nothing here blocks or performs I/O. Persisting the emitted updates is
/// the caller's responsibility.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::distance::{DistanceTracker, DistanceTrackerConfig, LocationCapability};
use crate::error::{ConfigError, TrackerError};
use crate::sleep::{SleepConfig, SleepInferencer};
use crate::step_detection::{StepDetector, StepDetectorConfig};
use crate::types::*;

/// Configuration for a complete tracking session.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Step detection parameters.
    pub step: StepDetectorConfig,
    /// GPS distance tracking parameters.
    pub distance: DistanceTrackerConfig,
    /// Sleep inference parameters.
    pub sleep: SleepConfig,
}

impl EngineConfig {
    /// Validate every sub-configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.step.validate()?;
        self.distance.validate()?;
        self.sleep.validate()
    }
}

/// Updates produced by one accelerometer sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionEvents {
    /// Accepted step, if any.
    pub step: Option<StepUpdate>,
    /// Sleep transition, if any.
    pub sleep: Option<SleepUpdate>,
}

impl SessionEvents {
    /// True when neither estimator emitted anything.
    pub fn is_empty(&self) -> bool {
        self.step.is_none() && self.sleep.is_none()
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSummary {
    /// Steps since the session started.
    pub steps: u64,
    /// Step-derived distance (m).
    pub step_distance_m: f64,
    /// Step-derived calories (kcal).
    pub calories: f64,
    /// Step-derived walking speed (km/h).
    pub step_speed_kmh: f64,
    /// GPS distance (km).
    pub gps_distance_km: f64,
    /// GPS speed (km/h).
    pub gps_speed_kmh: f64,
    /// Current sleep state.
    pub sleep_state: SleepState,
    /// Last completed sleep interval (hours).
    pub last_sleep_hours: Option<f64>,
}

/// One tracked user session.
pub struct TrackingSession {
    step_detector: StepDetector,
    distance_tracker: DistanceTracker,
    sleep_inferencer: SleepInferencer,
    active: bool,
}

impl TrackingSession {
    /// Creates a session with the given configuration. Not yet started.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            step_detector: StepDetector::new(config.step),
            distance_tracker: DistanceTracker::new(config.distance),
            sleep_inferencer: SleepInferencer::new(config.sleep),
            active: false,
        }
    }

    /// Creates a session after validating the configuration.
    pub fn try_new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Starts tracking with fresh estimator state.
    ///
    /// Accelerometer estimators always start. A missing location capability
    /// is returned once here; distance tracking stays inert until the next
    /// `start`.
    pub fn start<C: LocationCapability + ?Sized>(
        &mut self,
        capability: &C,
    ) -> Result<(), TrackerError> {
        self.step_detector.reset();
        self.sleep_inferencer.reset();
        self.active = true;
        info!("tracking session started");
        self.distance_tracker.start(capability)
    }

    /// Routes one accelerometer sample to the step detector and sleep inferencer.
    pub fn ingest_accel(&mut self, sample: &AccelSample, now: NaiveDateTime) -> SessionEvents {
        if !self.active {
            return SessionEvents::default();
        }
        SessionEvents {
            step: self.step_detector.ingest(sample),
            sleep: self.sleep_inferencer.ingest(sample, now),
        }
    }

    /// Routes one position fix to the distance tracker.
    pub fn ingest_fix(&mut self, fix: &GeoFix) -> Result<Option<DistanceUpdate>, TrackerError> {
        if !self.active {
            return Ok(None);
        }
        self.distance_tracker.ingest(fix)
    }

    /// Wall-clock tick for sleep inference.
    pub fn poll(&mut self, now: NaiveDateTime) -> Option<SleepUpdate> {
        if !self.active {
            return None;
        }
        self.sleep_inferencer.poll(now)
    }

    /// Stops tracking. Totals stay readable until `reset` or the next `start`.
    pub fn stop(&mut self) {
        self.active = false;
        self.distance_tracker.stop();
        info!(steps = self.step_detector.steps(), "tracking session stopped");
    }

    /// Zeroes every estimator without changing whether the session is active.
    pub fn reset(&mut self) {
        self.step_detector.reset();
        self.distance_tracker.reset();
        self.sleep_inferencer.reset();
        debug!("tracking session reset");
    }

    /// Returns a snapshot of every estimator.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            steps: self.step_detector.steps(),
            step_distance_m: self.step_detector.distance_m(),
            calories: self.step_detector.calories(),
            step_speed_kmh: self.step_detector.speed_kmh(),
            gps_distance_km: self.distance_tracker.total_distance_km(),
            gps_speed_kmh: self.distance_tracker.speed_kmh(),
            sleep_state: self.sleep_inferencer.state(),
            last_sleep_hours: self.sleep_inferencer.last_sleep_hours(),
        }
    }

    /// True between `start` and `stop`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Step detector, for diagnostics.
    pub fn step_detector(&self) -> &StepDetector {
        &self.step_detector
    }

    /// Distance tracker, for diagnostics.
    pub fn distance_tracker(&self) -> &DistanceTracker {
        &self.distance_tracker
    }

    /// Sleep inferencer, for diagnostics.
    pub fn sleep_inferencer(&self) -> &SleepInferencer {
        &self.sleep_inferencer
    }
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
