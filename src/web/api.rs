//! Snapshot assembly and JSON handlers for the web dashboard.
//!
//! Every request fetches fresh data from the backend. Each part of the
//! snapshot degrades on its own: a failed fetch leaves that part empty and
//! adds a line to `errors`, so one broken endpoint never blanks the page.

use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tiny_http::{Response, StatusCode};

use crate::api::Backend;
use crate::api::types::SettingsSnapshot;
use crate::live::series::{ChartPoint, MAX_POINTS};
use crate::overview::stats::{self, DayStats, StatusCard};
use crate::settings::sliders::Sliders;

use super::with_content_type;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdsView {
    pub good: u32,
    pub warning: u32,
    pub bad: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestView {
    pub ppm: u32,
    pub quality: String,
    pub label: String,
    pub color: String,
    pub timestamp: Option<String>,
    pub thermometer_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub state: StatusCard,
    pub title: String,
    pub advice: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZonesView {
    pub good_pct: f64,
    pub medium_pct: f64,
    pub bad_pct: f64,
}

/// Everything the page shows, also served as `GET /api/snapshot`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub generated_at: String,
    pub analysis_running: bool,
    pub thresholds: ThresholdsView,
    pub zones: ZonesView,
    pub card: Option<CardView>,
    pub latest: Option<LatestView>,
    pub stats: Option<DayStats>,
    pub chart: Vec<ChartPoint>,
    pub errors: Vec<String>,
}

pub fn build_snapshot<B: Backend + ?Sized>(backend: &B) -> Snapshot {
    let mut errors = Vec::new();

    let settings = match backend.fetch_settings() {
        Ok(s) => s,
        Err(e) => {
            errors.push(format!("settings: {e:#}"));
            SettingsSnapshot::default()
        }
    };
    let t = settings.thresholds;
    let sliders = Sliders::from_snapshot(&settings);
    let (good_pct, medium_pct, bad_pct) = sliders.zone_widths();

    let mut snapshot = Snapshot {
        generated_at: Local::now().to_rfc3339(),
        analysis_running: settings.analysis_running,
        thresholds: ThresholdsView {
            good: t.good(),
            warning: settings.warning_threshold,
            bad: t.bad(),
        },
        zones: ZonesView {
            good_pct,
            medium_pct,
            bad_pct,
        },
        card: None,
        latest: None,
        stats: None,
        chart: Vec::new(),
        errors,
    };

    if !settings.analysis_running {
        snapshot.card = Some(card_view(StatusCard::Paused));
        return snapshot;
    }

    match backend.latest() {
        Ok(latest) => {
            if let Some(ppm) = latest.ppm {
                let quality = t.classify(ppm);
                snapshot.card = Some(card_view(StatusCard::for_reading(ppm, t)));
                snapshot.latest = Some(LatestView {
                    ppm,
                    quality: quality.to_string(),
                    label: quality.label().to_string(),
                    color: t.smooth_color(ppm).hex(),
                    timestamp: latest.timestamp,
                    thermometer_pct: stats::thermometer_percent(ppm),
                });
            }
        }
        Err(e) => snapshot.errors.push(format!("latest: {e:#}")),
    }

    match backend.history_today() {
        Ok(readings) => snapshot.stats = stats::compute(&readings, t),
        Err(e) => snapshot.errors.push(format!("history: {e:#}")),
    }

    match backend.history_latest(MAX_POINTS) {
        Ok(readings) => {
            snapshot.chart = readings
                .iter()
                .map(|r| ChartPoint {
                    label: r.time_label(),
                    ppm: r.ppm,
                })
                .collect();
        }
        Err(e) => snapshot.errors.push(format!("chart: {e:#}")),
    }

    snapshot
}

fn card_view(card: StatusCard) -> CardView {
    CardView {
        state: card,
        title: card.title().to_string(),
        advice: card.advice().to_string(),
        color: card.color().hex(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(with_content_type(
        Response::from_data(body.into_bytes()).with_status_code(StatusCode(200)),
        "application/json; charset=utf-8",
    ))
}

/// `GET /api/snapshot`.
pub fn get_snapshot<B: Backend + ?Sized>(backend: &B) -> Result<Response<Cursor<Vec<u8>>>> {
    json_response(&build_snapshot(backend))
}

#[derive(Serialize)]
struct HealthResponse {
    backend_url: String,
    backend_reachable: bool,
}

/// `GET /api/health`.
pub fn get_health(client: &crate::api::ApiClient) -> Result<Response<Cursor<Vec<u8>>>> {
    json_response(&HealthResponse {
        backend_url: client.base_url().to_string(),
        backend_reachable: client.is_reachable(),
    })
}
