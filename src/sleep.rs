//! Sleep Inference Module.
//!
//! Infers sleep/wake transitions from accelerometer stillness and local
//! wall-clock time. A two-state machine:
//!
//! - **Awake**: any sample whose gravity-removed magnitude exceeds the motion
//!   threshold resets the stillness clock.
//! - **Awake → Asleep**: inside the night window, once the device has been
//!   motionless for the qualification period. Sleep onset is backdated to
//!   `last_motion + qualification period`.
//! - **Asleep → Awake**: on the first qualifying motion. Intervals shorter
//!   than the minimum sleep duration are discarded.
//!
//! This is a best-effort heuristic for coarse nightly summaries. It is not a
//! validated sleep-stage detector and must not be presented as one.

use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::debug;

use crate::error::{ensure_positive, ConfigError};
use crate::signal::{gravity_removed, STANDARD_GRAVITY};
use crate::types::{AccelSample, SleepState, SleepUpdate};

/// Configuration for sleep inference.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SleepConfig {
    /// Gravity subtracted from the raw magnitude (m/s²).
    pub gravity: f64,
    /// Gravity-removed magnitude above which a sample counts as motion (m/s²).
    pub motion_threshold: f64,
    /// Motionless minutes required before sleep is inferred.
    pub motionless_minutes: u32,
    /// Shortest interval reported as sleep, measured from the last motion.
    pub min_sleep_minutes: u32,
    /// Local hour the night window opens (inclusive).
    pub night_start_hour: u32,
    /// Local hour the night window closes (exclusive).
    pub night_end_hour: u32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            motion_threshold: 0.3,
            motionless_minutes: 30,
            min_sleep_minutes: 30,
            night_start_hour: 21,
            night_end_hour: 9,
        }
    }
}

impl SleepConfig {
    /// Check every parameter for a meaningful range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("gravity", self.gravity)?;
        ensure_positive("motion_threshold", self.motion_threshold)?;
        if self.motionless_minutes == 0 {
            return Err(ConfigError::invalid("motionless_minutes", "must be > 0"));
        }
        if self.night_start_hour > 23 {
            return Err(ConfigError::invalid(
                "night_start_hour",
                format!("must be in 0..24, got {}", self.night_start_hour),
            ));
        }
        if self.night_end_hour > 23 {
            return Err(ConfigError::invalid(
                "night_end_hour",
                format!("must be in 0..24, got {}", self.night_end_hour),
            ));
        }
        Ok(())
    }

    /// True when `hour` falls inside the night window.
    ///
    /// Windows may wrap midnight. Equal start and end hours cover the whole day.
    pub fn in_night_window(&self, hour: u32) -> bool {
        let (start, end) = (self.night_start_hour, self.night_end_hour);
        match start.cmp(&end) {
            std::cmp::Ordering::Greater => hour >= start || hour < end,
            std::cmp::Ordering::Less => hour >= start && hour < end,
            std::cmp::Ordering::Equal => true,
        }
    }
}

/// Sleep/wake inferencer over accelerometer samples and wall-clock ticks.
///
/// Feed every sample through [`ingest`](SleepInferencer::ingest) and call
/// [`poll`](SleepInferencer::poll) about once a minute so transitions fire
/// even when the sensor source goes quiet.
#[derive(Debug, Clone)]
pub struct SleepInferencer {
    config: SleepConfig,
    state: SleepState,

    /// Time of the last qualifying motion (start of the current stillness).
    last_motion: Option<NaiveDateTime>,
    /// Backdated onset of the open sleep interval. Set only while asleep.
    sleep_start: Option<NaiveDateTime>,
    /// Latest wall-clock time seen, for ordering checks.
    last_seen: Option<NaiveDateTime>,

    motionless_minutes: i64,
    last_sleep_hours: Option<f64>,
    dropped_samples: u64,
}

impl SleepInferencer {
    /// Create an inferencer in the Awake state.
    pub fn new(config: SleepConfig) -> Self {
        Self {
            config,
            state: SleepState::Awake,
            last_motion: None,
            sleep_start: None,
            last_seen: None,
            motionless_minutes: 0,
            last_sleep_hours: None,
            dropped_samples: 0,
        }
    }

    /// Create an inferencer after validating the configuration.
    pub fn try_new(config: SleepConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Fold one accelerometer sample observed at local time `now`.
    ///
    /// Runs an implicit [`poll`](Self::poll) first, so a night with no ticks
    /// still yields a completed interval when motion resumes.
    pub fn ingest(&mut self, sample: &AccelSample, now: NaiveDateTime) -> Option<SleepUpdate> {
        if !sample.is_valid() || self.is_stale(now) {
            self.dropped_samples += 1;
            debug!(timestamp_ms = sample.timestamp_ms, "dropping accel sample for sleep");
            return None;
        }

        let pending = self.evaluate(now);

        let motion = gravity_removed(sample.magnitude(), self.config.gravity);
        if motion <= self.config.motion_threshold {
            return pending;
        }

        match self.state {
            SleepState::Awake => {
                self.mark_motion(now);
                pending
            }
            SleepState::Asleep => {
                let update = self.wake(now);
                self.mark_motion(now);
                update
            }
        }
    }

    /// Periodic wall-clock tick.
    ///
    /// Updates the motionless counter and fires Awake → Asleep when the
    /// device has been still long enough inside the night window.
    pub fn poll(&mut self, now: NaiveDateTime) -> Option<SleepUpdate> {
        if self.is_stale(now) {
            return None;
        }
        self.evaluate(now)
    }

    /// Current state.
    pub fn state(&self) -> SleepState {
        self.state
    }

    /// Whole minutes since the last motion, as of the last sample or tick.
    pub fn motionless_minutes(&self) -> i64 {
        self.motionless_minutes
    }

    /// Duration of the last completed sleep interval in hours.
    pub fn last_sleep_hours(&self) -> Option<f64> {
        self.last_sleep_hours
    }

    /// Onset of the open sleep interval, if asleep.
    pub fn sleep_start(&self) -> Option<NaiveDateTime> {
        self.sleep_start
    }

    /// Time of the last qualifying motion.
    pub fn last_motion(&self) -> Option<NaiveDateTime> {
        self.last_motion
    }

    /// Number of samples dropped as malformed or out of order.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Active configuration.
    pub fn config(&self) -> &SleepConfig {
        &self.config
    }

    /// Return to a fresh Awake state. Idempotent.
    pub fn reset(&mut self) {
        self.state = SleepState::Awake;
        self.last_motion = None;
        self.sleep_start = None;
        self.last_seen = None;
        self.motionless_minutes = 0;
        self.last_sleep_hours = None;
        self.dropped_samples = 0;
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    fn is_stale(&self, now: NaiveDateTime) -> bool {
        self.last_seen.is_some_and(|seen| now < seen)
    }

    fn evaluate(&mut self, now: NaiveDateTime) -> Option<SleepUpdate> {
        self.last_seen = Some(now);

        // The first observation of a session starts the stillness clock
        let last_motion = *self.last_motion.get_or_insert(now);
        let still_for = now - last_motion;
        self.motionless_minutes = still_for.num_minutes();

        let qualification = Duration::minutes(i64::from(self.config.motionless_minutes));
        if self.state == SleepState::Awake
            && still_for >= qualification
            && self.config.in_night_window(now.hour())
        {
            let sleep_start = last_motion + qualification;
            self.state = SleepState::Asleep;
            self.sleep_start = Some(sleep_start);
            debug!(%sleep_start, "sleep inferred");
            return Some(SleepUpdate::FellAsleep { sleep_start });
        }
        None
    }

    fn wake(&mut self, now: NaiveDateTime) -> Option<SleepUpdate> {
        self.state = SleepState::Awake;
        let sleep_start = self.sleep_start.take()?;
        let still_since = self.last_motion?;

        let interval = now - still_since;
        let minimum = Duration::minutes(i64::from(self.config.min_sleep_minutes));
        if interval < minimum {
            debug!(minutes = interval.num_minutes(), "discarding short sleep interval");
            return None;
        }

        let duration_hours = interval.num_milliseconds() as f64 / 3_600_000.0;
        self.last_sleep_hours = Some(duration_hours);
        debug!(%sleep_start, woke_at = %now, duration_hours, "wake inferred");

        Some(SleepUpdate::WokeUp {
            sleep_start,
            woke_at: now,
            duration_hours,
        })
    }

    fn mark_motion(&mut self, now: NaiveDateTime) {
        self.last_motion = Some(now);
        self.motionless_minutes = 0;
    }
}

impl Default for SleepInferencer {
    fn default() -> Self {
        Self::new(SleepConfig::default())
    }
}
