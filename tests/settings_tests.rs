//! Settings panel tests: slider reconciliation through the editor, debounced
//! autosave, toasts and the fallback when the backend is down.

mod support;

use std::time::Duration;

use co2dash::config::schema::DashConfig;
use co2dash::runtime::ManualClock;
use co2dash::settings::sliders::{Slider, Sliders};
use co2dash::settings::{self, SettingsEditor};
use support::{FakeBackend, quiet, settings};

fn editor(backend: &FakeBackend) -> (SettingsEditor<FakeBackend, ManualClock>, ManualClock) {
    quiet();
    let clock = ManualClock::default();
    let editor = SettingsEditor::new(backend.clone(), clock.clone(), &DashConfig::default());
    (editor, clock)
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[test]
fn editor_reconciles_sliders_on_every_edit() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut ed, _clock) = editor(&backend);
    assert_eq!(
        ed.panel().sliders(),
        Sliders {
            good: 800,
            warning: 900,
            critical: 1200
        }
    );

    ed.handle_line("good 1300");
    let s = ed.panel().sliders();
    assert_eq!((s.good, s.warning, s.critical), (1300, 1350, 1400));

    ed.handle_line("critical 430");
    let s = ed.panel().sliders();
    assert_eq!((s.good, s.warning, s.critical), (400, 450, 500));

    ed.handle_line("warning +1000");
    let s = ed.panel().sliders();
    assert_eq!((s.good, s.warning, s.critical), (400, 1450, 1500));
    assert!(s.is_ordered());
}

#[test]
fn out_of_range_values_are_clamped_not_panicking() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut ed, _clock) = editor(&backend);

    assert!(ed.handle_line("good 4294967295"));
    let s = ed.panel().sliders();
    assert_eq!((s.good, s.warning, s.critical), (1900, 1950, 2000));
    assert!(s.is_ordered());

    assert!(ed.handle_line("good -9223372036854775807"));
    assert!(ed.handle_line("critical +9223372036854775807"));
    let s = ed.panel().sliders();
    assert_eq!((s.good, s.critical), (400, 2000));
    assert!(s.is_ordered());
}

#[test]
fn slider_values_snap_to_step() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut ed, _clock) = editor(&backend);
    ed.handle_line("good 712");
    assert_eq!(ed.panel().sliders().get(Slider::Good), 700);
    ed.handle_line("good 725");
    assert_eq!(ed.panel().sliders().get(Slider::Good), 750);
}

// ---------------------------------------------------------------------------
// Autosave
// ---------------------------------------------------------------------------

#[test]
fn rapid_edits_produce_a_single_save() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut ed, clock) = editor(&backend);

    for line in ["good 850", "good 900", "warning 1100", "speed 3"] {
        ed.handle_line(line);
        clock.advance(Duration::from_millis(500));
        ed.process_due();
    }
    assert_eq!(ed.save_count(), 0);
    assert!(ed.autosave_pending());

    clock.advance(Duration::from_millis(300));
    ed.process_due();
    assert_eq!(ed.save_count(), 1);
    assert!(!ed.autosave_pending());

    let saved = backend.state().saved.clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].thresholds.good(), 900);
    assert_eq!(saved[0].warning_threshold, 1100);
    assert_eq!(saved[0].thresholds.bad(), 1200);
    assert_eq!(saved[0].update_speed_secs, 3);
}

#[test]
fn explicit_save_cancels_the_pending_autosave() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut ed, clock) = editor(&backend);

    ed.handle_line("critical 1500");
    ed.handle_line("save");
    assert_eq!(ed.save_count(), 1);
    assert!(!ed.autosave_pending());
    assert!(ed.toast().unwrap().ok);

    clock.advance(Duration::from_secs(5));
    ed.process_due();
    assert_eq!(ed.save_count(), 1);
    assert!(ed.toast().is_none());
    assert_eq!(backend.state().settings.thresholds.bad(), 1500);
}

#[test]
fn quitting_flushes_a_pending_save() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut ed, _clock) = editor(&backend);

    ed.handle_line("analysis off");
    assert!(!ed.handle_line("quit"));
    assert_eq!(ed.save_count(), 1);
    assert!(!backend.state().settings.analysis_running);
}

#[test]
fn failed_save_shows_an_error_toast() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut ed, _clock) = editor(&backend);
    backend.state().settings_down = true;

    ed.handle_line("good 700");
    ed.handle_line("save");
    let toast = ed.toast().unwrap();
    assert!(!toast.ok);
    assert!(toast.message.contains("Save failed"));
    assert!(ed.panel().is_dirty());
}

#[test]
fn load_failure_falls_back_to_defaults() {
    let backend = FakeBackend::default();
    backend.state().settings_down = true;
    let (ed, _clock) = editor(&backend);

    let s = ed.panel().sliders();
    assert_eq!((s.good, s.warning, s.critical), (800, 1000, 1200));
    assert_eq!(ed.panel().snapshot().update_speed_secs, 1);
    assert_eq!(ed.panel().snapshot().overview_update_speed_secs, 5);
    assert!(!ed.toast().unwrap().ok);
}

#[test]
fn bad_input_is_reported_not_applied() {
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let (mut ed, _clock) = editor(&backend);

    assert!(ed.handle_line("speed 0"));
    assert!(ed.handle_line("brightness 3"));
    assert!(!ed.autosave_pending());
    assert!(!ed.toast().unwrap().ok);
}

// ---------------------------------------------------------------------------
// One-shot set
// ---------------------------------------------------------------------------

#[test]
fn set_saves_once_with_reconciled_values() {
    quiet();
    let backend = FakeBackend::with_settings(settings(800, 1200, 1, 5));
    let panel = settings::set(&backend, "critical", "850").unwrap();
    let s = panel.sliders();
    assert_eq!((s.good, s.warning, s.critical), (750, 800, 850));
    assert_eq!(backend.state().saved.len(), 1);
    assert!(settings::set(&backend, "save", "now").is_err());
}
