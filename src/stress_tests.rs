/// Long-running and property-based tests for the estimators.
///
/// These push the estimators through sustained, pathological or randomized
/// input and check the invariants that must hold for any stream.

#[cfg(test)]
mod stress_tests {
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    use crate::distance::*;
    use crate::signal::STANDARD_GRAVITY;
    use crate::sleep::*;
    use crate::step_detection::*;
    use crate::types::*;

    fn midnight() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Accumulate (gap, xy, z) triples into a timestamped stream.
    fn stream_from(steps: &[(u64, f64, f64)]) -> Vec<AccelSample> {
        let mut t = 0;
        steps
            .iter()
            .map(|&(gap, xy, z)| {
                t += gap;
                AccelSample::new(t, xy, -xy, z)
            })
            .collect()
    }

    // ============================================================================
    // CATEGORY 1: EXTREME DURATION & THROUGHPUT
    // ============================================================================

    /// One hour of 50Hz walking: buffers stay bounded, counts stay exact.
    #[test]
    fn stress_one_hour_walk_50hz() {
        let mut detector = StepDetector::default();
        let mut last_steps = 0;

        for i in 0..180_000u64 {
            let t = i * 20;
            let extra = if t % 500 < 100 { 4.0 } else { 0.0 };
            let sample = AccelSample::new(t, 0.1, 0.2, STANDARD_GRAVITY + extra);
            if let Some(update) = detector.ingest(&sample) {
                assert_eq!(update.steps, last_steps + 1);
                last_steps = update.steps;
            }
        }

        assert_eq!(detector.steps(), 7_200);
        assert_relative_eq!(detector.distance_m(), 7_200.0 * 0.72, epsilon = 1e-6);
        assert!(detector.speed_window_len() <= 11);
        assert_eq!(detector.history_len(), 100);
    }

    /// Twenty-four hours of minute ticks with no samples at all.
    #[test]
    fn stress_day_of_ticks_without_samples() {
        let mut inferencer = SleepInferencer::default();
        let mut transitions = 0;
        for minute in 0..(24 * 60) {
            if inferencer.poll(midnight() + Duration::minutes(minute)).is_some() {
                transitions += 1;
            }
        }
        // Still since the first tick: exactly one interval opens, none close
        assert_eq!(transitions, 1);
        assert_eq!(inferencer.state(), SleepState::Asleep);
        assert_eq!(inferencer.sleep_start(), Some(midnight() + Duration::minutes(30)));
    }

    /// A week of nights: one completed interval per night.
    #[test]
    fn stress_week_of_nights() {
        let mut inferencer = SleepInferencer::default();
        let motion = AccelSample::new(0, 0.0, 0.0, STANDARD_GRAVITY + 2.0);
        let mut completed = Vec::new();

        for day in 0..7 {
            let evening = midnight() + Duration::days(day) + Duration::hours(22);
            inferencer.ingest(&motion, evening);
            for minute in 1..(8 * 60) {
                inferencer.poll(evening + Duration::minutes(minute));
            }
            let morning = evening + Duration::hours(8);
            completed.extend(inferencer.ingest(&motion, morning));
            // Active day: motion every 20 minutes until shortly before the evening
            for step in 1..48 {
                inferencer.ingest(&motion, morning + Duration::minutes(step * 20));
            }
        }

        assert_eq!(completed.len(), 7);
        for update in completed {
            assert_relative_eq!(update.duration_hours().unwrap(), 8.0, epsilon = 1e-9);
        }
    }

    /// Fixes every second for a six-hour stationary session.
    #[test]
    fn stress_long_stationary_gps() {
        let mut tracker = DistanceTracker::default();
        let origin = GeoFix::new(0, -33.8568, 151.2153);
        let jitter_deg = (1.5 / (EARTH_RADIUS_KM * 1000.0)).to_degrees();

        for i in 0..21_600u64 {
            let phase = (i % 4) as f64;
            let fix = GeoFix::new(
                i * 1_000,
                origin.latitude + jitter_deg * (phase - 1.5).signum(),
                origin.longitude,
            );
            assert_eq!(tracker.ingest(&fix), Ok(None));
        }
        assert_eq!(tracker.total_distance_km(), 0.0);
    }

    // ============================================================================
    // CATEGORY 2: PATHOLOGICAL INPUT
    // ============================================================================

    #[test]
    fn stress_all_nan_stream() {
        let mut detector = StepDetector::default();
        for i in 0..1_000 {
            let sample = AccelSample::new(i * 20, f64::NAN, f64::NAN, f64::NAN);
            assert!(detector.ingest(&sample).is_none());
        }
        assert_eq!(detector.steps(), 0);
        assert_eq!(detector.dropped_samples(), 1_000);
    }

    #[test]
    fn stress_saturated_sensor() {
        let mut detector = StepDetector::default();
        // Pinned at full scale: never falls below threshold, never counts
        for i in 0..5_000 {
            let sample = AccelSample::new(i * 20, 78.4, 78.4, 78.4);
            assert!(detector.ingest(&sample).is_none());
        }
        assert_eq!(detector.steps(), 0);
    }

    #[test]
    fn stress_reset_mid_stream() {
        let mut detector = StepDetector::default();
        for i in 0..10_000u64 {
            let t = i * 20;
            if i % 1_000 == 0 {
                detector.reset();
            }
            let extra = if t % 500 < 100 { 4.0 } else { 0.0 };
            detector.ingest(&AccelSample::new(t, 0.0, 0.0, STANDARD_GRAVITY + extra));
        }
        // 1000 samples = 20s = 40 steps after the final reset
        assert_eq!(detector.steps(), 40);
    }

    // ============================================================================
    // CATEGORY 3: PROPERTIES
    // ============================================================================

    proptest! {
        #[test]
        fn prop_steps_monotonic_and_distance_derived(
            raw in prop::collection::vec((0u64..60, -2.0f64..2.0, 0.0f64..25.0), 1..800)
        ) {
            let mut detector = StepDetector::default();
            let mut last = 0u64;
            for sample in stream_from(&raw) {
                if let Some(update) = detector.ingest(&sample) {
                    prop_assert_eq!(update.steps, last + 1);
                    prop_assert!((update.distance_m - update.steps as f64 * 0.72).abs() < 1e-9);
                    prop_assert!(update.speed_kmh >= 0.0);
                }
                prop_assert!(detector.steps() >= last);
                last = detector.steps();
                prop_assert!((detector.distance_m() - last as f64 * 0.72).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_steps_respect_min_interval(
            raw in prop::collection::vec((0u64..60, -2.0f64..2.0, 0.0f64..25.0), 1..800)
        ) {
            let mut detector = StepDetector::default();
            let updates = detector.process_batch(&stream_from(&raw));
            for pair in updates.windows(2) {
                prop_assert!(pair[1].timestamp_ms - pair[0].timestamp_ms >= 280);
            }
        }

        #[test]
        fn prop_reset_is_idempotent(
            raw in prop::collection::vec((0u64..60, -2.0f64..2.0, 0.0f64..25.0), 0..300)
        ) {
            let mut detector = StepDetector::default();
            detector.process_batch(&stream_from(&raw));
            detector.reset();
            let once = format!("{detector:?}");
            detector.reset();
            prop_assert_eq!(format!("{detector:?}"), once);
            prop_assert_eq!(format!("{detector:?}"), format!("{:?}", StepDetector::default()));
        }

        #[test]
        fn prop_jitter_never_accumulates(
            lat in -60.0f64..60.0,
            lon in -170.0f64..170.0,
            offsets in prop::collection::vec((-3.0f64..3.0, -3.0f64..3.0, 0u64..120_000), 1..50)
        ) {
            let r = EARTH_RADIUS_KM * 1000.0;
            let mut tracker = DistanceTracker::default();
            tracker.ingest(&GeoFix::new(0, lat, lon)).unwrap();

            let mut t = 0;
            for (north, east, gap) in offsets {
                t += gap;
                let fix = GeoFix::new(
                    t,
                    lat + (north / r).to_degrees(),
                    lon + (east / (r * lat.to_radians().cos())).to_degrees(),
                );
                prop_assert_eq!(tracker.ingest(&fix), Ok(None));
            }
            prop_assert_eq!(tracker.total_distance_km(), 0.0);
        }

        #[test]
        fn prop_gps_distance_monotonic(
            hops in prop::collection::vec((-0.001f64..0.001, -0.001f64..0.001, 0u64..60_000), 1..100)
        ) {
            let mut tracker = DistanceTracker::default();
            let (mut lat, mut lon, mut t) = (45.0, 7.0, 0u64);
            let mut last = 0.0;
            tracker.ingest(&GeoFix::new(t, lat, lon)).unwrap();
            for (dlat, dlon, gap) in hops {
                lat += dlat;
                lon += dlon;
                t += gap;
                tracker.ingest(&GeoFix::new(t, lat, lon)).unwrap();
                prop_assert!(tracker.total_distance_km() >= last);
                last = tracker.total_distance_km();
            }
        }

        #[test]
        fn prop_short_stillness_never_sleeps(minutes in 1i64..30) {
            let mut inferencer = SleepInferencer::default();
            let motion = AccelSample::new(0, 0.0, 0.0, STANDARD_GRAVITY + 1.0);
            let start = midnight() + Duration::hours(23);
            inferencer.ingest(&motion, start);
            prop_assert!(inferencer.poll(start + Duration::minutes(minutes)).is_none());
            prop_assert!(inferencer.ingest(&motion, start + Duration::minutes(minutes)).is_none());
        }

        #[test]
        fn prop_long_stillness_sleeps(minutes in 30i64..600) {
            let mut inferencer = SleepInferencer::default();
            let motion = AccelSample::new(0, 0.0, 0.0, STANDARD_GRAVITY + 1.0);
            let start = midnight() + Duration::hours(22);
            inferencer.ingest(&motion, start);
            let update = inferencer.ingest(&motion, start + Duration::minutes(minutes));
            prop_assert!(update.is_some());
            let hours = update.and_then(|u| u.duration_hours()).unwrap_or_default();
            prop_assert!((hours - minutes as f64 / 60.0).abs() < 1e-9);
        }
    }
}
