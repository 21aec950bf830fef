//! Day statistics and the status card.

use serde::Serialize;

use crate::api::types::Reading;
use crate::state::quality::{GREY, Quality, Rgb, THRESHOLD_MAX, Thresholds};

/// Summary of today's readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayStats {
    /// Mean ppm, rounded half away from zero.
    pub avg: u32,
    pub max: u32,
    /// Readings at or above the bad threshold. Readings are taken once a
    /// minute, so this doubles as minutes spent in the bad band.
    pub bad_minutes: u32,
    pub count: usize,
}

/// `None` for an empty history.
pub fn compute(readings: &[Reading], thresholds: Thresholds) -> Option<DayStats> {
    let max = readings.iter().map(|r| r.ppm).max()?;
    let sum: u64 = readings.iter().map(|r| u64::from(r.ppm)).sum();
    let avg = (sum as f64 / readings.len() as f64).round() as u32;
    let bad_minutes = readings
        .iter()
        .filter(|r| r.ppm >= thresholds.bad())
        .count() as u32;
    Some(DayStats {
        avg,
        max,
        bad_minutes,
        count: readings.len(),
    })
}

/// `time,ppm` export of a day's history.
pub fn day_csv(readings: &[Reading]) -> String {
    let mut out = String::from("time,ppm\n");
    for r in readings {
        out.push_str(&format!("{},{}\n", r.time_label(), r.ppm));
    }
    out
}

/// Thermometer fill, `min(ppm / 2000, 1) × 100`.
pub fn thermometer_percent(ppm: u32) -> f64 {
    (f64::from(ppm) / f64::from(THRESHOLD_MAX)).min(1.0) * 100.0
}

// ---------------------------------------------------------------------------
// Status card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCard {
    Good,
    Medium,
    Bad,
    Paused,
}

impl StatusCard {
    pub fn for_reading(ppm: u32, thresholds: Thresholds) -> Self {
        match thresholds.classify(ppm) {
            Quality::Good => Self::Good,
            Quality::Medium => Self::Medium,
            Quality::Bad => Self::Bad,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Good => "Excellent",
            Self::Medium => "Acceptable",
            Self::Bad => "Poor",
            Self::Paused => "Analysis paused",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::Good => "Healthy air, nothing to do",
            Self::Medium => "Keep an eye on air quality",
            Self::Bad => "Ventilate the room as soon as possible",
            Self::Paused => "No data being collected",
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            Self::Good => Quality::Good.color(),
            Self::Medium => Quality::Medium.color(),
            Self::Bad => Quality::Bad.color(),
            Self::Paused => GREY,
        }
    }
}
