//! Threshold alerts.
//!
//! An alert is raised when consecutive readings cross the bad threshold in
//! either direction. The log keeps the newest entries first and drops the
//! oldest beyond its capacity.

pub mod prefs;

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::state::quality::Thresholds;

pub const MAX_ALERTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ThresholdExceeded,
    Recovery,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThresholdExceeded => write!(f, "threshold_exceeded"),
            Self::Recovery => write!(f, "recovery"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub ppm: u32,
    pub threshold: u32,
    pub at: DateTime<Local>,
    pub message: String,
}

impl Alert {
    pub fn new(kind: AlertKind, ppm: u32, threshold: u32, at: DateTime<Local>) -> Self {
        let message = match kind {
            AlertKind::ThresholdExceeded => {
                format!("CO₂ at {ppm} ppm, above the {threshold} ppm threshold")
            }
            AlertKind::Recovery => format!("CO₂ back to {ppm} ppm, below {threshold} ppm"),
        };
        Self {
            kind,
            ppm,
            threshold,
            at,
            message,
        }
    }
}

/// Which alert, if any, the step `previous -> current` raises.
pub fn detect(previous: Option<u32>, current: u32, thresholds: Thresholds) -> Option<AlertKind> {
    let bad = thresholds.bad();
    let previous = previous?;
    match (previous >= bad, current >= bad) {
        (false, true) => Some(AlertKind::ThresholdExceeded),
        (true, false) => Some(AlertKind::Recovery),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct AlertLog {
    entries: VecDeque<Alert>,
    capacity: usize,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::with_capacity(MAX_ALERTS)
    }
}

impl AlertLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert at the front; the oldest entry falls off the back.
    pub fn push(&mut self, alert: Alert) {
        self.entries.push_front(alert);
        self.entries.truncate(self.capacity);
    }

    /// Remove by display index (0 = newest).
    pub fn remove(&mut self, index: usize) -> Option<Alert> {
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.entries.iter()
    }
}
