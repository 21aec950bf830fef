//! In-memory backend shared by the session tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use co2dash::api::Backend;
use co2dash::api::types::{self, LatestReading, Reading, SettingsSnapshot};
use co2dash::state::quality::Thresholds;

#[derive(Debug, Default)]
pub struct FakeState {
    pub settings: SettingsSnapshot,
    pub settings_down: bool,
    pub latest: LatestReading,
    pub latest_down: bool,
    pub history: Vec<Reading>,
    pub history_down: bool,
    pub saved: Vec<SettingsSnapshot>,
    pub latest_calls: usize,
    pub settings_calls: usize,
}

/// Clones share state, so a test keeps a handle after moving one into a
/// session.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend(pub Rc<RefCell<FakeState>>);

impl FakeBackend {
    pub fn with_settings(settings: SettingsSnapshot) -> Self {
        let fake = Self::default();
        fake.0.borrow_mut().settings = settings;
        fake
    }

    pub fn state(&self) -> std::cell::RefMut<'_, FakeState> {
        self.0.borrow_mut()
    }

    pub fn set_latest(&self, ppm: u32, timestamp: &str, running: bool) {
        let reading = types::parse_latest(serde_json::json!({
            "ppm": ppm,
            "timestamp": timestamp,
            "analysis_running": running,
        }))
        .unwrap();
        self.state().latest = reading;
    }
}

impl Backend for FakeBackend {
    fn fetch_settings(&self) -> Result<SettingsSnapshot> {
        let mut s = self.0.borrow_mut();
        s.settings_calls += 1;
        if s.settings_down {
            anyhow::bail!("connection refused");
        }
        Ok(s.settings.clone())
    }

    fn save_settings(&self, settings: &SettingsSnapshot) -> Result<()> {
        let mut s = self.0.borrow_mut();
        if s.settings_down {
            anyhow::bail!("connection refused");
        }
        s.saved.push(settings.clone());
        s.settings = settings.clone();
        Ok(())
    }

    fn latest(&self) -> Result<LatestReading> {
        let mut s = self.0.borrow_mut();
        s.latest_calls += 1;
        if s.latest_down {
            anyhow::bail!("timed out");
        }
        Ok(s.latest.clone())
    }

    fn history_today(&self) -> Result<Vec<Reading>> {
        let s = self.0.borrow();
        if s.history_down {
            anyhow::bail!("timed out");
        }
        Ok(s.history.clone())
    }

    fn history_latest(&self, n: usize) -> Result<Vec<Reading>> {
        let s = self.0.borrow();
        if s.history_down {
            anyhow::bail!("timed out");
        }
        let skip = s.history.len().saturating_sub(n);
        Ok(s.history[skip..].to_vec())
    }
}

pub fn settings(good: u32, bad: u32, speed: u32, overview_speed: u32) -> SettingsSnapshot {
    SettingsSnapshot {
        thresholds: Thresholds::new(good, bad).unwrap(),
        warning_threshold: good + 100,
        critical_threshold: bad,
        update_speed_secs: speed,
        overview_update_speed_secs: overview_speed,
        ..SettingsSnapshot::default()
    }
}

/// Readings one minute apart, starting at 08:00 today.
pub fn readings(values: &[u32]) -> Vec<Reading> {
    let day = chrono::Local::now().format("%Y-%m-%d").to_string();
    let raw: Vec<serde_json::Value> = values
        .iter()
        .enumerate()
        .map(|(i, ppm)| {
            serde_json::json!({
                "ppm": ppm,
                "timestamp": format!("{day}T{:02}:{:02}:00", 8 + i / 60, i % 60),
            })
        })
        .collect();
    types::parse_history(serde_json::Value::Array(raw)).unwrap()
}

pub fn quiet() {
    co2dash::events::set_enabled(false);
    co2dash::events::set_stderr_echo(false);
    colored::control::set_override(false);
}
