//! Live session tests.
//!
//! Drives `LiveSession` with an in-memory backend and a manual clock, so
//! every timer decision is deterministic.

mod support;

use std::time::Duration;

use co2dash::alerts::AlertKind;
use co2dash::alerts::prefs::Preferences;
use co2dash::api::push::PushEvent;
use co2dash::api::types;
use co2dash::config::schema::{DashConfig, TransportMode};
use co2dash::live::corridor::Phase;
use co2dash::live::{LiveSession, LiveTimer};
use co2dash::runtime::ManualClock;
use support::{FakeBackend, quiet, readings, settings};

fn config(transport: TransportMode) -> DashConfig {
    let mut config = DashConfig::default();
    config.live.transport = transport;
    config
}

fn session(
    backend: &FakeBackend,
    transport: TransportMode,
) -> (LiveSession<FakeBackend, ManualClock>, ManualClock) {
    quiet();
    let clock = ManualClock::default();
    let session = LiveSession::new(
        backend.clone(),
        clock.clone(),
        &config(transport),
        &Preferences::default(),
    );
    (session, clock)
}

fn reading(ppm: u32, ts: &str) -> PushEvent {
    PushEvent::Reading(
        types::parse_latest(serde_json::json!({
            "ppm": ppm,
            "timestamp": ts,
            "analysis_running": true,
        }))
        .unwrap(),
    )
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[test]
fn poll_mode_uses_backend_update_speed() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 2, 5));
    backend.set_latest(900, "2024-03-01T10:00:00", true);
    let (mut live, clock) = session(&backend, TransportMode::Poll);

    live.start();
    assert_eq!(backend.state().latest_calls, 1, "one poll at start");
    assert_eq!(
        live.scheduler().period(LiveTimer::Poll),
        Some(Duration::from_secs(2))
    );
    assert_eq!(live.corridor().series().len(), 1);

    clock.advance(Duration::from_millis(1999));
    live.process_due();
    assert_eq!(backend.state().latest_calls, 1);

    clock.advance(Duration::from_millis(1));
    live.process_due();
    assert_eq!(backend.state().latest_calls, 2);
    // Same timestamp again: deduplicated.
    assert_eq!(live.corridor().series().len(), 1);
}

#[test]
fn speed_change_reschedules_the_poll() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 2, 5));
    let (mut live, _clock) = session(&backend, TransportMode::Poll);
    live.start();

    live.handle_push(PushEvent::Settings(settings(800, 1200, 5, 5)));
    assert_eq!(
        live.scheduler().period(LiveTimer::Poll),
        Some(Duration::from_secs(5))
    );
    assert_eq!(live.scheduler().len(), 2);
}

#[test]
fn pause_and_resume_never_duplicate_the_poll_timer() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 2, 5));
    backend.set_latest(900, "2024-03-01T10:00:00", true);
    let (mut live, clock) = session(&backend, TransportMode::Poll);
    live.start();
    assert!(live.scheduler().is_scheduled(LiveTimer::Poll));

    backend.state().settings.analysis_running = false;
    clock.advance(Duration::from_secs(2));
    live.process_due();
    assert_eq!(live.corridor().phase(), Phase::Paused);
    assert!(!live.scheduler().is_scheduled(LiveTimer::Poll));
    assert_eq!(live.scheduler().len(), 1);

    backend.state().settings.analysis_running = true;
    clock.advance(Duration::from_secs(2));
    live.process_due();
    assert_eq!(live.corridor().phase(), Phase::Running);
    assert!(live.scheduler().is_scheduled(LiveTimer::Poll));
    assert_eq!(live.scheduler().len(), 2);

    // A second "resume" is a no-op.
    live.handle_push(PushEvent::AnalysisState(true));
    assert_eq!(live.scheduler().len(), 2);
}

#[test]
fn paused_reading_stops_polling_and_later_readings_are_ignored() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut live, _clock) = session(&backend, TransportMode::Poll);
    live.start();

    backend.set_latest(950, "2024-03-01T10:00:01", false);
    live.handle_timer(LiveTimer::Poll);
    assert_eq!(live.corridor().phase(), Phase::Paused);
    assert!(!live.scheduler().is_scheduled(LiveTimer::Poll));

    live.handle_push(PushEvent::Reading(
        types::parse_latest(serde_json::json!({ "ppm": 990, "timestamp": "2024-03-01T10:00:02" }))
            .unwrap(),
    ));
    assert!(live.corridor().series().is_empty());
}

// ---------------------------------------------------------------------------
// Push transport
// ---------------------------------------------------------------------------

#[test]
fn auto_mode_polls_only_while_push_is_down() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut live, _clock) = session(&backend, TransportMode::Auto);
    live.start();
    assert!(!live.scheduler().is_scheduled(LiveTimer::Poll));

    live.handle_push(PushEvent::Disconnected("connection refused".into()));
    assert!(live.corridor().is_polling());
    assert!(live.scheduler().is_scheduled(LiveTimer::Poll));
    assert_eq!(live.status(), Some("push stream unavailable"));

    live.handle_push(PushEvent::Connected);
    assert!(!live.corridor().is_polling());
    assert!(!live.scheduler().is_scheduled(LiveTimer::Poll));
    assert_eq!(live.status(), None);
}

#[test]
fn pushed_readings_feed_chart_nav_and_alerts() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    backend.state().history = readings(&[700, 710, 720]);
    let (mut live, _clock) = session(&backend, TransportMode::Push);
    live.start();
    assert_eq!(live.nav().len(), 3);

    live.handle_push(reading(1000, "2024-03-01T10:00:00"));
    live.handle_push(reading(1000, "2024-03-01T10:00:00"));
    live.handle_push(reading(1300, "2024-03-01T10:00:01"));

    assert_eq!(live.corridor().series().values(), vec![1000, 1300]);
    assert_eq!(live.nav().len(), 5);
    assert_eq!(live.alerts().len(), 1);
    let alert = live.alerts().iter().next().unwrap();
    assert_eq!(alert.kind, AlertKind::ThresholdExceeded);
    assert!(live.take_bell());
    assert!(!live.take_bell());

    live.handle_push(reading(900, "2024-03-01T10:00:02"));
    assert_eq!(live.alerts().len(), 2);
    assert_eq!(
        live.alerts().iter().next().unwrap().kind,
        AlertKind::Recovery
    );
}

#[test]
fn chart_never_exceeds_max_points() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut live, _clock) = session(&backend, TransportMode::Push);
    live.start();
    for i in 0..40u32 {
        live.handle_push(reading(600 + i, &format!("2024-03-01T10:00:{i:02}")));
    }
    let values = live.corridor().series().values();
    assert_eq!(values.len(), 25);
    assert_eq!(values.first(), Some(&615));
    assert_eq!(values.last(), Some(&639));
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[test]
fn typed_commands_manage_chart_and_alerts() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut live, _clock) = session(&backend, TransportMode::Push);
    live.start();
    live.handle_push(reading(1000, "2024-03-01T10:00:00"));
    live.handle_push(reading(1300, "2024-03-01T10:00:01"));

    let dir = std::env::temp_dir().join(format!("co2dash-live-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("chart.csv");
    assert!(live.handle_line(&format!("export {}", path.display())));
    let csv = std::fs::read_to_string(&path).unwrap();
    assert!(csv.starts_with("time,ppm\n"));
    assert!(csv.trim_end().ends_with(",1300"));
    let _ = std::fs::remove_dir_all(&dir);

    assert!(live.handle_line("dismiss 0"));
    assert!(live.alerts().is_empty());
    assert!(live.handle_line("dismiss 3"));
    assert_eq!(live.status(), Some("no alert #3"));

    assert!(live.handle_line("reset"));
    assert!(live.corridor().series().is_empty());
    assert_eq!(live.corridor().last_ppm(), Some(1300));

    assert!(!live.handle_line("quit"));
}

#[test]
fn settings_failure_at_start_falls_back_to_defaults() {
    let backend = FakeBackend::default();
    backend.state().settings_down = true;
    let (mut live, _clock) = session(&backend, TransportMode::Poll);
    live.start();

    assert!(!live.store().is_loaded());
    assert_eq!(live.store().thresholds().bad(), 1200);
    assert_eq!(live.poll_interval(), Duration::from_millis(1000));
    assert!(live.status().unwrap().contains("could not load settings"));
}
