//! Backend payloads.
//!
//! Every JSON body is deserialized into a private `Raw*` struct first and
//! converted into a validated record exactly once, here. A payload with a
//! missing or out-of-range field is rejected with an error naming the field;
//! nothing downstream re-checks field presence.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::state::quality::{THRESHOLD_MAX, THRESHOLD_MIN, Thresholds};

/// Upper bound on a plausible sensor value; anything above is a shape error.
const MAX_PLAUSIBLE_PPM: f64 = 100_000.0;

pub const DEFAULT_WARNING_THRESHOLD: u32 = 1000;
pub const DEFAULT_CRITICAL_THRESHOLD: u32 = 1200;
pub const DEFAULT_UPDATE_SPEED_SECS: u32 = 1;
pub const DEFAULT_OVERVIEW_SPEED_SECS: u32 = 5;
/// Upper bound accepted for both update speeds.
pub const MAX_SPEED_SECS: u32 = 3600;

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 and the naive ISO form the backend emits when it has no
/// zone information (interpreted as local time).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Local));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt)
            && let Some(local) = Local.from_local_datetime(&naive).earliest()
        {
            return Ok(local);
        }
    }
    anyhow::bail!("unrecognised timestamp '{raw}'")
}

fn ppm_field(name: &str, value: f64) -> Result<u32> {
    if !value.is_finite() || !(0.0..=MAX_PLAUSIBLE_PPM).contains(&value) {
        anyhow::bail!("{name} = {value} is not a plausible ppm value");
    }
    Ok(value.round() as u32)
}

fn threshold_field(name: &str, value: Option<f64>, default: Option<u32>) -> Result<u32> {
    let Some(value) = value else {
        return default.with_context(|| format!("missing field '{name}'"));
    };
    let rounded = ppm_field(name, value)?;
    if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&rounded) {
        anyhow::bail!("{name} = {rounded} outside {THRESHOLD_MIN}..={THRESHOLD_MAX}");
    }
    Ok(rounded)
}

fn speed_field(name: &str, value: Option<f64>, default: u32) -> Result<u32> {
    let Some(value) = value else {
        return Ok(default);
    };
    if !value.is_finite() || value < 1.0 || value > f64::from(MAX_SPEED_SECS) {
        anyhow::bail!("{name} = {value} outside 1..={MAX_SPEED_SECS} seconds");
    }
    Ok(value.round() as u32)
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// One stored reading from the history endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub ppm: u32,
    /// Timestamp exactly as the backend sent it.
    pub timestamp: String,
    pub at: DateTime<Local>,
}

impl Reading {
    /// `HH:MM:SS` in local time, used for chart labels and CSV exports.
    pub fn time_label(&self) -> String {
        self.at.format("%H:%M:%S").to_string()
    }
}

#[derive(Debug, Deserialize)]
struct RawReading {
    #[serde(alias = "co2")]
    ppm: Option<f64>,
    timestamp: Option<String>,
}

impl RawReading {
    fn validate(self) -> Result<Reading> {
        let ppm = ppm_field("ppm", self.ppm.context("missing field 'ppm'")?)?;
        let timestamp = self.timestamp.context("missing field 'timestamp'")?;
        let at = parse_timestamp(&timestamp)?;
        Ok(Reading { ppm, timestamp, at })
    }
}

/// Parse an ordered history array. The whole payload is rejected if any
/// element is malformed.
pub fn parse_history(body: serde_json::Value) -> Result<Vec<Reading>> {
    let raw: Vec<RawReading> =
        serde_json::from_value(body).context("history payload is not an array of readings")?;
    raw.into_iter()
        .enumerate()
        .map(|(i, r)| r.validate().with_context(|| format!("history[{i}]")))
        .collect()
}

/// The latest reading, as returned by `GET /api/latest` and pushed as
/// `reading-update`. Every field may be absent: no reading yet, no
/// timestamp, or an older backend without the analysis flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LatestReading {
    pub ppm: Option<u32>,
    pub timestamp: Option<String>,
    pub at: Option<DateTime<Local>>,
    pub analysis_running: Option<bool>,
}

impl LatestReading {
    /// Label for the chart: the reading's own time when known, else now.
    pub fn time_label(&self) -> String {
        self.at
            .unwrap_or_else(Local::now)
            .format("%H:%M:%S")
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct RawLatest {
    #[serde(default, alias = "co2")]
    ppm: Option<f64>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    analysis_running: Option<bool>,
}

pub fn parse_latest(body: serde_json::Value) -> Result<LatestReading> {
    let raw: RawLatest =
        serde_json::from_value(body).context("latest payload is not an object")?;
    let ppm = raw.ppm.map(|v| ppm_field("ppm", v)).transpose()?;
    let at = raw.timestamp.as_deref().map(parse_timestamp).transpose()?;
    Ok(LatestReading {
        ppm,
        timestamp: raw.timestamp,
        at,
        analysis_running: raw.analysis_running,
    })
}

// ---------------------------------------------------------------------------
// Settings snapshot
// ---------------------------------------------------------------------------

/// The backend's settings record. The authoritative copy lives on the
/// backend; this is what a page last saw.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub thresholds: Thresholds,
    pub warning_threshold: u32,
    pub critical_threshold: u32,
    pub analysis_running: bool,
    pub update_speed_secs: u32,
    pub overview_update_speed_secs: u32,
    pub realistic_mode: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
            analysis_running: true,
            update_speed_secs: DEFAULT_UPDATE_SPEED_SECS,
            overview_update_speed_secs: DEFAULT_OVERVIEW_SPEED_SECS,
            realistic_mode: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    good_threshold: Option<f64>,
    bad_threshold: Option<f64>,
    warning_threshold: Option<f64>,
    critical_threshold: Option<f64>,
    analysis_running: Option<bool>,
    update_speed: Option<f64>,
    overview_update_speed: Option<f64>,
    realistic_mode: Option<bool>,
}

/// Wire form written by `POST /api/settings`.
#[derive(Debug, Serialize)]
struct SettingsBody {
    good_threshold: u32,
    bad_threshold: u32,
    warning_threshold: u32,
    critical_threshold: u32,
    analysis_running: bool,
    update_speed: u32,
    overview_update_speed: u32,
    realistic_mode: bool,
}

pub fn parse_settings(body: serde_json::Value) -> Result<SettingsSnapshot> {
    let raw: RawSettings =
        serde_json::from_value(body).context("settings payload is not an object")?;

    let good = threshold_field("good_threshold", raw.good_threshold, None)?;
    let bad = threshold_field("bad_threshold", raw.bad_threshold, None)?;
    let thresholds = Thresholds::new(good, bad)?;

    Ok(SettingsSnapshot {
        thresholds,
        warning_threshold: threshold_field(
            "warning_threshold",
            raw.warning_threshold,
            Some(DEFAULT_WARNING_THRESHOLD),
        )?,
        critical_threshold: threshold_field(
            "critical_threshold",
            raw.critical_threshold,
            Some(bad),
        )?,
        analysis_running: raw.analysis_running.unwrap_or(true),
        update_speed_secs: speed_field(
            "update_speed",
            raw.update_speed,
            DEFAULT_UPDATE_SPEED_SECS,
        )?,
        overview_update_speed_secs: speed_field(
            "overview_update_speed",
            raw.overview_update_speed,
            DEFAULT_OVERVIEW_SPEED_SECS,
        )?,
        realistic_mode: raw.realistic_mode.unwrap_or(true),
    })
}

impl SettingsSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        let body = SettingsBody {
            good_threshold: self.thresholds.good(),
            bad_threshold: self.thresholds.bad(),
            warning_threshold: self.warning_threshold,
            critical_threshold: self.critical_threshold,
            analysis_running: self.analysis_running,
            update_speed: self.update_speed_secs,
            overview_update_speed: self.overview_update_speed_secs,
            realistic_mode: self.realistic_mode,
        };
        serde_json::to_value(body).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Read-only feature payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub hour: u32,
    pub predicted_co2: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub description: String,
    pub value: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub impact: String,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub title: String,
    pub description: String,
    pub priority: String,
}

/// `{ success, <list_key>: [...] }`.
pub fn parse_feature_list<T: serde::de::DeserializeOwned>(
    mut body: serde_json::Value,
    list_key: &str,
) -> Result<Vec<T>> {
    let success = body
        .get("success")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if !success {
        let reason = body
            .get("error")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("backend reported failure");
        anyhow::bail!("{list_key}: {reason}");
    }
    let list = body
        .get_mut(list_key)
        .map(serde_json::Value::take)
        .with_context(|| format!("missing field '{list_key}'"))?;
    serde_json::from_value(list).with_context(|| format!("malformed '{list_key}' list"))
}

// ---------------------------------------------------------------------------
// Maintenance / export
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CleanupResponse {
    pub deleted: u64,
}

/// Result of `POST /api/export/simulate`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// Raw CSV body, ready to be written to a file.
    Csv(String),
    Json(JsonExport),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonExport {
    #[serde(default)]
    pub success: bool,
    pub records: u64,
    #[serde(default)]
    pub period_days: u32,
    #[serde(default)]
    pub export_date: Option<String>,
    #[serde(default)]
    pub data: Vec<ExportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub timestamp: String,
    pub co2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Excel,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "excel" | "xlsx" => Ok(Self::Excel),
            other => anyhow::bail!("unknown export format '{other}' (csv, json, excel)"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "excel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => anyhow::bail!("unknown frequency '{other}' (daily, weekly, monthly)"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledExport {
    pub id: i64,
    pub format: String,
    pub frequency: String,
    #[serde(default)]
    pub next_execution: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduledExportsResponse {
    #[serde(default)]
    pub exports: Vec<ScheduledExport>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_parse_full_payload() {
        let s = parse_settings(json!({
            "good_threshold": 800,
            "bad_threshold": 1200,
            "warning_threshold": 1000,
            "critical_threshold": 1200,
            "analysis_running": false,
            "update_speed": 2,
            "overview_update_speed": 10,
            "realistic_mode": false
        }))
        .unwrap();
        assert_eq!(s.thresholds.good(), 800);
        assert_eq!(s.thresholds.bad(), 1200);
        assert!(!s.analysis_running);
        assert_eq!(s.update_speed_secs, 2);
        assert_eq!(s.overview_update_speed_secs, 10);
        assert!(!s.realistic_mode);
    }

    #[test]
    fn settings_optional_fields_default() {
        let s = parse_settings(json!({ "good_threshold": 700, "bad_threshold": 1500 })).unwrap();
        assert!(s.analysis_running);
        assert_eq!(s.warning_threshold, DEFAULT_WARNING_THRESHOLD);
        assert_eq!(s.critical_threshold, 1500);
        assert_eq!(s.update_speed_secs, 1);
        assert_eq!(s.overview_update_speed_secs, 5);
    }

    #[test]
    fn settings_reject_shape_mismatch() {
        assert!(parse_settings(json!({ "bad_threshold": 1200 })).is_err());
        assert!(parse_settings(json!({ "good_threshold": "800", "bad_threshold": 1200 })).is_err());
        assert!(parse_settings(json!({ "good_threshold": 1300, "bad_threshold": 1200 })).is_err());
        assert!(parse_settings(json!({ "good_threshold": 800, "bad_threshold": 9000 })).is_err());
        assert!(
            parse_settings(json!({ "good_threshold": 800, "bad_threshold": 1200, "update_speed": 0 }))
                .is_err()
        );
        assert!(parse_settings(json!([1, 2])).is_err());
    }

    #[test]
    fn settings_to_json_round_trips() {
        let s = SettingsSnapshot::default();
        assert_eq!(parse_settings(s.to_json()).unwrap(), s);
    }

    #[test]
    fn latest_allows_missing_fields() {
        let l = parse_latest(json!({ "analysis_running": false })).unwrap();
        assert_eq!(l.ppm, None);
        assert_eq!(l.analysis_running, Some(false));

        let l = parse_latest(json!({ "ppm": 912.4, "timestamp": "2026-03-01T10:15:00" })).unwrap();
        assert_eq!(l.ppm, Some(912));
        assert_eq!(l.time_label(), "10:15:00");
    }

    #[test]
    fn latest_rejects_bad_values() {
        assert!(parse_latest(json!({ "ppm": -4 })).is_err());
        assert!(parse_latest(json!({ "ppm": 800, "timestamp": "yesterday" })).is_err());
    }

    #[test]
    fn history_parses_and_rejects_whole_payload() {
        let h = parse_history(json!([
            { "ppm": 650, "timestamp": "2026-03-01T08:00:00+00:00" },
            { "co2": 700, "timestamp": "2026-03-01 08:01:00" }
        ]))
        .unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h[1].ppm, 700);

        assert!(parse_history(json!([{ "ppm": 650 }])).is_err());
        assert!(parse_history(json!({ "ppm": 650 })).is_err());
        assert!(parse_history(json!([])).unwrap().is_empty());
    }

    #[test]
    fn feature_list_requires_success() {
        let preds: Vec<Prediction> = parse_feature_list(
            json!({ "success": true, "predictions": [{ "hour": 1, "predicted_co2": 812.5, "confidence": 80 }] }),
            "predictions",
        )
        .unwrap();
        assert_eq!(preds[0].hour, 1);

        let err = parse_feature_list::<Insight>(json!({ "success": false }), "insights");
        assert!(err.is_err());
        let err = parse_feature_list::<Insight>(json!({ "success": true }), "insights");
        assert!(err.is_err());
    }

    #[test]
    fn export_format_and_frequency_parse() {
        assert_eq!(ExportFormat::parse("CSV").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("xlsx").unwrap(), ExportFormat::Excel);
        assert!(ExportFormat::parse("pdf").is_err());
        assert_eq!(Frequency::parse("weekly").unwrap().as_str(), "weekly");
        assert!(Frequency::parse("hourly").is_err());
    }
}
