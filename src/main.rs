//! Motion Fusion Engine
//!
//! Replays a synthetic day (a short GPS-tracked walk and one night of sleep)
//! through a tracking session and prints what a caller would persist.
//!
//! Set `RUST_LOG=motion_fusion=debug` to see estimator decisions.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use motion_fusion::{
    AccelSample, EngineConfig, GeoFix, SleepUpdate, TrackingSession, STANDARD_GRAVITY,
};
use tracing_subscriber::EnvFilter;

const SAMPLE_INTERVAL_MS: u64 = 20;
const STEP_INTERVAL_MS: u64 = 500;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Motion Fusion Engine v{}", env!("CARGO_PKG_VERSION"));

    let mut session = TrackingSession::new(EngineConfig::default());
    if let Err(err) = session.start(&true) {
        eprintln!("distance tracking unavailable: {err}");
    }

    let Some(morning) = local_time(1, 8, 0) else {
        return;
    };
    replay_walk(&mut session, morning, 120);
    replay_night(&mut session);

    let summary = session.summary();
    println!("\n=== Summary ===");
    println!("Steps:          {}", summary.steps);
    println!("Step distance:  {:.1} m", summary.step_distance_m);
    println!("Calories:       {:.2} kcal", summary.calories);
    println!("Walking speed:  {:.2} km/h", summary.step_speed_kmh);
    println!("GPS distance:   {:.3} km", summary.gps_distance_km);
    println!("GPS speed:      {:.2} km/h", summary.gps_speed_kmh);
    if let Some(hours) = summary.last_sleep_hours {
        println!("Last sleep:     {hours:.2} h");
    }

    session.stop();
}

fn local_time(day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2024, 6, day)?.and_hms_opt(hour, minute, 0)
}

/// Walk north at 2 steps/s with one GPS fix per second.
fn replay_walk(session: &mut TrackingSession, start: NaiveDateTime, seconds: u64) {
    let origin = GeoFix::new(0, 37.5665, 126.9780);
    let deg_per_m = (1.0 / 6_371_000.0_f64).to_degrees();
    if let Err(err) = session.ingest_fix(&origin) {
        eprintln!("gps: {err}");
    }

    for i in 0..seconds * 1000 / SAMPLE_INTERVAL_MS {
        let t = i * SAMPLE_INTERVAL_MS;
        let extra = if t % STEP_INTERVAL_MS < 100 { 4.0 } else { 0.0 };
        let sample = AccelSample::new(t, 0.2, -0.1, STANDARD_GRAVITY + extra);
        let now = start + Duration::milliseconds(t as i64);

        let events = session.ingest_accel(&sample, now);
        if let Some(step) = events.step {
            if step.steps % 50 == 0 {
                println!(
                    "step {:>4}: {:.1} m, {:.2} kcal, {:.2} km/h",
                    step.steps, step.distance_m, step.calories, step.speed_kmh
                );
            }
        }

        if t % 1000 == 0 && t > 0 {
            let meters = t as f64 / 1000.0 * 1.44;
            let fix = GeoFix::new(t, origin.latitude + meters * deg_per_m, origin.longitude);
            match session.ingest_fix(&fix) {
                Ok(Some(update)) => println!(
                    "gps: {:.3} km at {:.2} km/h",
                    update.total_distance_km, update.speed_kmh
                ),
                Ok(None) => {}
                Err(err) => eprintln!("gps: {err}"),
            }
        }
    }
}

/// Still from 23:00 to 06:30, ticking once a minute.
fn replay_night(session: &mut TrackingSession) {
    let (Some(bedtime), Some(wake)) = (local_time(1, 23, 0), local_time(2, 6, 30)) else {
        return;
    };
    // Monotonic clock continues from the 08:00 walk
    let stir = |minutes_after_walk: u64| {
        AccelSample::new(minutes_after_walk * 60_000, 0.0, 0.0, STANDARD_GRAVITY + 1.0)
    };

    session.ingest_accel(&stir(15 * 60), bedtime);
    let mut now = bedtime;
    while now < wake {
        now += Duration::minutes(1);
        if let Some(update) = session.poll(now) {
            report_sleep(&update);
        }
    }
    if let Some(update) = session.ingest_accel(&stir(22 * 60 + 30), wake).sleep {
        report_sleep(&update);
    }
}

fn report_sleep(update: &SleepUpdate) {
    match update {
        SleepUpdate::FellAsleep { sleep_start } => println!("sleep: asleep since {sleep_start}"),
        SleepUpdate::WokeUp {
            sleep_start,
            woke_at,
            duration_hours,
        } => println!("sleep: {sleep_start} → {woke_at} ({duration_hours:.2} h)"),
    }
}
