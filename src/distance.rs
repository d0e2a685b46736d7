//! GPS Distance Tracking Module.
//!
//! Accumulates walking distance from irregular position fixes:
//! - Haversine great-circle distance between accepted fixes
//! - Minimum-displacement noise gate so jitter at rest never accumulates
//! - Instantaneous speed between consecutive accepted fixes
//!
//! The location provider itself lives outside the engine. Whether the
//! platform can supply fixes at all is abstracted behind
//! [`LocationCapability`], checked once when tracking starts.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::error::{ensure_positive, ConfigError, TrackerError};
use crate::types::{DistanceUpdate, GeoFix};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Port for the platform location capability.
///
/// Implemented by whatever adapter owns the location provider subscription.
pub trait LocationCapability {
    /// True when the device can deliver position fixes.
    fn is_available(&self) -> bool;
}

impl LocationCapability for bool {
    fn is_available(&self) -> bool {
        *self
    }
}

/// Great-circle distance between two fixes in kilometers.
pub fn haversine_km(from: &GeoFix, to: &GeoFix, radius_km: f64) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = (to.latitude - from.latitude).to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    radius_km * c
}

/// Configuration for distance tracking.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DistanceTrackerConfig {
    /// Sphere radius for the haversine formula (km).
    pub earth_radius_km: f64,
    /// Displacement at or below which a fix is discarded as jitter (m).
    pub min_displacement_m: f64,
    /// Number of accepted fixes kept as route history.
    pub route_capacity: usize,
}

impl Default for DistanceTrackerConfig {
    fn default() -> Self {
        Self {
            earth_radius_km: EARTH_RADIUS_KM,
            min_displacement_m: 5.0,
            route_capacity: 1024,
        }
    }
}

impl DistanceTrackerConfig {
    /// Check every parameter for a meaningful range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("earth_radius_km", self.earth_radius_km)?;
        if !(self.min_displacement_m.is_finite() && self.min_displacement_m >= 0.0) {
            return Err(ConfigError::invalid(
                "min_displacement_m",
                format!("must be finite and >= 0, got {}", self.min_displacement_m),
            ));
        }
        if self.route_capacity == 0 {
            return Err(ConfigError::invalid("route_capacity", "must be > 0"));
        }
        Ok(())
    }
}

/// Tracking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerStatus {
    /// Not tracking. Fixes are ignored.
    Idle,
    /// Accepting fixes.
    Tracking,
    /// Capability missing. `reported` flips once the error has been surfaced.
    Unsupported { reported: bool },
}

/// Cumulative distance tracker over a stream of position fixes.
///
/// A freshly constructed tracker is already tracking; call
/// [`start`](DistanceTracker::start) to gate it on a capability check.
#[derive(Debug, Clone)]
pub struct DistanceTracker {
    config: DistanceTrackerConfig,
    status: TrackerStatus,

    // Accepted fixes, newest at the back
    route: VecDeque<GeoFix>,
    total_distance_km: f64,
    speed_kmh: f64,

    dropped_fixes: u64,
}

impl DistanceTracker {
    /// Create a tracker with the given configuration.
    pub fn new(config: DistanceTrackerConfig) -> Self {
        Self {
            route: VecDeque::with_capacity(config.route_capacity.min(64)),
            status: TrackerStatus::Tracking,
            total_distance_km: 0.0,
            speed_kmh: 0.0,
            dropped_fixes: 0,
            config,
        }
    }

    /// Create a tracker after validating the configuration.
    pub fn try_new(config: DistanceTrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Begin a tracking session after checking the location capability.
    ///
    /// Clears any previous session. On a missing capability the error is
    /// returned here and the tracker stays inert until `start` is retried.
    pub fn start<C: LocationCapability + ?Sized>(
        &mut self,
        capability: &C,
    ) -> Result<(), TrackerError> {
        self.reset();
        if capability.is_available() {
            self.status = TrackerStatus::Tracking;
            debug!("distance tracking started");
            Ok(())
        } else {
            self.status = TrackerStatus::Unsupported { reported: true };
            warn!("location capability unavailable, distance tracking inert");
            Err(TrackerError::Unsupported)
        }
    }

    /// Stop accepting fixes. Accumulated distance is kept until reset.
    ///
    /// A missing capability stays recorded, so a pending
    /// `TrackerError::Unsupported` is still surfaced by the next `ingest`.
    pub fn stop(&mut self) {
        if self.status == TrackerStatus::Tracking {
            self.status = TrackerStatus::Idle;
        }
    }

    /// Mark the capability as lost mid-session.
    ///
    /// The next `ingest` returns `TrackerError::Unsupported` once; later
    /// fixes are ignored until `start` succeeds again.
    pub fn capability_lost(&mut self) {
        warn!("location capability lost");
        self.status = TrackerStatus::Unsupported { reported: false };
    }

    /// Fold one position fix into the tracker.
    ///
    /// Returns an update only when the fix clears the noise gate. The first
    /// fix of a session is stored as the reference and emits nothing.
    pub fn ingest(&mut self, fix: &GeoFix) -> Result<Option<DistanceUpdate>, TrackerError> {
        match self.status {
            TrackerStatus::Tracking => {}
            TrackerStatus::Idle | TrackerStatus::Unsupported { reported: true } => return Ok(None),
            TrackerStatus::Unsupported { reported: false } => {
                self.status = TrackerStatus::Unsupported { reported: true };
                return Err(TrackerError::Unsupported);
            }
        }

        if !fix.is_valid() {
            self.dropped_fixes += 1;
            debug!(timestamp_ms = fix.timestamp_ms, "dropping malformed fix");
            return Ok(None);
        }

        let Some(last) = self.route.back().copied() else {
            self.push_route(*fix);
            return Ok(None);
        };

        if fix.timestamp_ms < last.timestamp_ms {
            self.dropped_fixes += 1;
            debug!(timestamp_ms = fix.timestamp_ms, "dropping out-of-order fix");
            return Ok(None);
        }

        let delta_km = haversine_km(&last, fix, self.config.earth_radius_km);
        if delta_km * 1000.0 <= self.config.min_displacement_m {
            debug!(delta_m = delta_km * 1000.0, "fix below displacement gate");
            return Ok(None);
        }

        self.total_distance_km += delta_km;
        let elapsed_ms = fix.timestamp_ms - last.timestamp_ms;
        if elapsed_ms > 0 {
            self.speed_kmh = delta_km / (elapsed_ms as f64 / MS_PER_HOUR);
        }
        self.push_route(*fix);

        trace!(
            total_km = self.total_distance_km,
            speed_kmh = self.speed_kmh,
            "fix accepted"
        );

        Ok(Some(DistanceUpdate {
            timestamp_ms: fix.timestamp_ms,
            total_distance_km: self.total_distance_km,
            speed_kmh: self.speed_kmh,
        }))
    }

    /// Cumulative distance since tracking started (km).
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    /// Speed between the last two accepted fixes (km/h).
    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    /// Recent accepted fixes, oldest first.
    pub fn accepted_fixes(&self) -> impl Iterator<Item = &GeoFix> + '_ {
        self.route.iter()
    }

    /// Most recent accepted fix.
    pub fn last_fix(&self) -> Option<&GeoFix> {
        self.route.back()
    }

    /// True while fixes are being accepted.
    pub fn is_tracking(&self) -> bool {
        self.status == TrackerStatus::Tracking
    }

    /// Number of fixes dropped as malformed or out of order.
    pub fn dropped_fixes(&self) -> u64 {
        self.dropped_fixes
    }

    /// Active configuration.
    pub fn config(&self) -> &DistanceTrackerConfig {
        &self.config
    }

    /// Clear route, distance and speed. Tracking status is unchanged.
    pub fn reset(&mut self) {
        self.route.clear();
        self.total_distance_km = 0.0;
        self.speed_kmh = 0.0;
        self.dropped_fixes = 0;
    }

    fn push_route(&mut self, fix: GeoFix) {
        let capacity = self.config.route_capacity.max(1);
        while self.route.len() >= capacity {
            self.route.pop_front();
        }
        self.route.push_back(fix);
    }
}

impl Default for DistanceTracker {
    fn default() -> Self {
        Self::new(DistanceTrackerConfig::default())
    }
}
