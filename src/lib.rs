//! Motion Fusion Engine Library
//!
//! Streaming estimators that turn raw, noisy accelerometer and GPS streams
//! into step counts, walking speed, travel distance and sleep/wake inference.
//!
//! # Estimators
//!
//! - [`StepDetector`]: acceleration samples in, step events with derived
//!   distance, calories and speed out.
//! - [`DistanceTracker`]: position fixes in, noise-gated great-circle
//!   distance and speed out.
//! - [`SleepInferencer`]: acceleration samples plus local wall-clock time in,
//!   sleep/wake transitions and sleep duration out.
//!
//! The three share no state and can run concurrently. Each is a plain owned
//! struct with `ingest`/`reset` (and `poll` for sleep): one instance per
//! tracked session, fed from a single stream in timestamp order. None of
//! them lock, block, allocate per sample or perform I/O. Persisting results,
//! requesting sensor permissions and rendering are the caller's job.
//!
//! # Design Philosophy
//!
//! - **Bounded work per sample**: fixed-size buffers, O(1) updates.
//! - **Bad input is absorbed, not fatal**: malformed or out-of-order samples
//!   are dropped and counted; the worst outcome is "no update this tick".
//! - **Explicit tunables**: stride length and calorie cost are uncalibrated
//!   constants exposed on the config structs.
//!
//! # Example
//!
//! ```
//! use motion_fusion::{AccelSample, GeoFix, StepDetector, DistanceTracker};
//!
//! let mut steps = StepDetector::default();
//! for i in 0..50u64 {
//!     let z = if i % 25 < 5 { 13.81 } else { 9.81 };
//!     if let Some(update) = steps.ingest(&AccelSample::new(i * 20, 0.0, 0.0, z)) {
//!         println!("{} steps, {:.2} m", update.steps, update.distance_m);
//!     }
//! }
//!
//! let mut gps = DistanceTracker::default();
//! gps.ingest(&GeoFix::new(0, 37.5665, 126.9780)).unwrap();
//! let update = gps.ingest(&GeoFix::new(60_000, 37.5674, 126.9780)).unwrap();
//! assert!(update.is_some());
//! ```

pub mod distance;
pub mod error;
pub mod session;
pub mod signal;
pub mod sleep;
pub mod step_detection;
pub mod types;

mod stress_tests;

// Re-export commonly used types
pub use distance::{haversine_km, DistanceTracker, DistanceTrackerConfig, LocationCapability};
pub use error::{ConfigError, Error, Result, TrackerError};
pub use session::{EngineConfig, SessionEvents, SessionSummary, TrackingSession};
pub use signal::{KalmanFilter, STANDARD_GRAVITY};
pub use sleep::{SleepConfig, SleepInferencer};
pub use step_detection::{StepDetector, StepDetectorConfig};
pub use types::{
    AccelSample, DistanceUpdate, GeoFix, SleepState, SleepUpdate, StepUpdate,
};
