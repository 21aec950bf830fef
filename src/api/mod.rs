//! HTTP client for the CO₂ backend.
//!
//! Talks to the co-located backend using the synchronous `ureq` client.
//! Every method performs exactly one request and returns a validated record
//! from [`types`]; callers decide whether a failure is fatal (one-shot CLI
//! commands) or just a warning (periodic timers).
//!
//! The [`Backend`] trait is the seam the sessions depend on, so the live,
//! overview and settings loops can be driven by an in-memory fake in tests.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::schema::BackendConfig;

pub mod push;
pub mod types;

use types::{
    Anomaly, CleanupResponse, ExportFormat, ExportOutcome, Frequency, Insight, JsonExport,
    LatestReading, Prediction, Reading, Recommendation, ScheduledExport,
    ScheduledExportsResponse, SettingsSnapshot,
};

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// The subset of the backend the periodic sessions use.
pub trait Backend {
    fn fetch_settings(&self) -> Result<SettingsSnapshot>;
    fn save_settings(&self, settings: &SettingsSnapshot) -> Result<()>;
    fn latest(&self) -> Result<LatestReading>;
    fn history_today(&self) -> Result<Vec<Reading>>;
    fn history_latest(&self, n: usize) -> Result<Vec<Reading>>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous backend client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    push_path: String,
}

impl ApiClient {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            push_path: config.push_path.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL of the server-sent events stream.
    pub fn push_url(&self) -> String {
        self.url(&self.push_path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_value(&self, path: &str) -> Result<serde_json::Value> {
        ureq::get(&self.url(path))
            .timeout(self.timeout)
            .call()
            .with_context(|| format!("GET {path} failed"))?
            .into_json()
            .with_context(|| format!("GET {path} returned invalid JSON"))
    }

    fn send_value(
        &self,
        method: &str,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ureq::Response> {
        let request = ureq::request(method, &self.url(path)).timeout(self.timeout);
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        result.with_context(|| format!("{method} {path} failed"))
    }

    /// Whether the backend answers the settings endpoint at all.
    pub fn is_reachable(&self) -> bool {
        ureq::get(&self.url("/api/settings"))
            .timeout(Duration::from_secs(3))
            .call()
            .is_ok()
    }

    /// Whether the push stream accepts a connection. Only the response
    /// headers are read; the body is dropped unread.
    pub fn push_available(&self) -> bool {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(3))
            .timeout_read(Duration::from_secs(3))
            .build();
        match agent.get(&self.push_url()).call() {
            Ok(resp) => resp.content_type().starts_with("text/event-stream"),
            Err(_) => false,
        }
    }

    // -- Settings --

    /// `DELETE /api/settings`: restore backend defaults.
    pub fn reset_settings(&self) -> Result<()> {
        self.send_value("DELETE", "/api/settings", None)?;
        Ok(())
    }

    // -- Read-only feature payloads --

    pub fn predictions(&self, hours: u32) -> Result<Vec<Prediction>> {
        let body = self.get_value(&format!("/api/analytics/predictions?hours={hours}"))?;
        types::parse_feature_list(body, "predictions")
    }

    pub fn anomalies(&self) -> Result<Vec<Anomaly>> {
        types::parse_feature_list(self.get_value("/api/analytics/anomalies")?, "anomalies")
    }

    pub fn insights(&self) -> Result<Vec<Insight>> {
        types::parse_feature_list(self.get_value("/api/analytics/insights")?, "insights")
    }

    pub fn recommendations(&self) -> Result<Vec<Recommendation>> {
        types::parse_feature_list(
            self.get_value("/api/health/recommendations")?,
            "recommendations",
        )
    }

    // -- Maintenance --

    /// `POST /api/cleanup`: purge readings older than `days`; returns the
    /// number of deleted rows.
    pub fn cleanup(&self, days: u32) -> Result<u64> {
        let body = serde_json::json!({ "days": days });
        let resp: CleanupResponse = self
            .send_value("POST", "/api/cleanup", Some(&body))?
            .into_json()
            .context("cleanup response has no 'deleted' count")?;
        Ok(resp.deleted)
    }

    // -- Exports --

    /// `POST /api/export/simulate`. CSV comes back as a raw body, JSON as a
    /// summary object.
    pub fn export_simulate(&self, format: ExportFormat, period_days: u32) -> Result<ExportOutcome> {
        if format == ExportFormat::Excel {
            anyhow::bail!("simulated exports support csv and json only");
        }
        let body = serde_json::json!({ "format": format.as_str(), "period_days": period_days });
        let resp = self.send_value("POST", "/api/export/simulate", Some(&body))?;

        match format {
            ExportFormat::Csv => {
                let text = resp
                    .into_string()
                    .context("failed to read CSV export body")?;
                Ok(ExportOutcome::Csv(text))
            }
            _ => {
                let summary: JsonExport = resp
                    .into_json()
                    .context("JSON export response is malformed")?;
                if !summary.success {
                    anyhow::bail!("backend reported a failed export");
                }
                Ok(ExportOutcome::Json(summary))
            }
        }
    }

    /// `POST /api/export/schedule`.
    pub fn schedule_export(&self, format: ExportFormat, frequency: Frequency) -> Result<()> {
        let body = serde_json::json!({ "format": format.as_str(), "frequency": frequency.as_str() });
        self.send_value("POST", "/api/export/schedule", Some(&body))?;
        Ok(())
    }

    /// `GET /api/export/scheduled`.
    pub fn scheduled_exports(&self) -> Result<Vec<ScheduledExport>> {
        let body = self.get_value("/api/export/scheduled")?;
        let resp: ScheduledExportsResponse =
            serde_json::from_value(body).context("malformed scheduled exports payload")?;
        Ok(resp.exports)
    }

    /// `DELETE /api/export/scheduled/{id}`.
    pub fn delete_scheduled_export(&self, id: i64) -> Result<()> {
        self.send_value("DELETE", &format!("/api/export/scheduled/{id}"), None)?;
        Ok(())
    }

    /// `GET /api/report/daily/pdf`: raw PDF bytes.
    pub fn daily_report_pdf(&self) -> Result<Vec<u8>> {
        let resp = self.send_value("GET", "/api/report/daily/pdf", None)?;
        let mut bytes = Vec::new();
        resp.into_reader()
            .read_to_end(&mut bytes)
            .context("failed to read PDF report")?;
        if !bytes.starts_with(b"%PDF") {
            anyhow::bail!("daily report is not a PDF document");
        }
        Ok(bytes)
    }
}

impl Backend for ApiClient {
    /// `GET /api/settings`.
    fn fetch_settings(&self) -> Result<SettingsSnapshot> {
        types::parse_settings(self.get_value("/api/settings")?)
            .context("invalid /api/settings payload")
    }

    /// `POST /api/settings` with the full snapshot.
    fn save_settings(&self, settings: &SettingsSnapshot) -> Result<()> {
        self.send_value("POST", "/api/settings", Some(&settings.to_json()))?;
        Ok(())
    }

    /// `GET /api/latest`.
    fn latest(&self) -> Result<LatestReading> {
        types::parse_latest(self.get_value("/api/latest")?).context("invalid /api/latest payload")
    }

    /// `GET /api/history/today`.
    fn history_today(&self) -> Result<Vec<Reading>> {
        types::parse_history(self.get_value("/api/history/today")?)
            .context("invalid /api/history/today payload")
    }

    /// `GET /api/history/latest/{n}`.
    fn history_latest(&self, n: usize) -> Result<Vec<Reading>> {
        types::parse_history(self.get_value(&format!("/api/history/latest/{n}"))?)
            .with_context(|| format!("invalid /api/history/latest/{n} payload"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_strips_trailing_slash() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:5000/".to_string(),
            ..BackendConfig::default()
        };
        let client = ApiClient::from_config(&config);
        assert_eq!(client.base_url(), "http://127.0.0.1:5000");
        assert_eq!(client.push_url(), "http://127.0.0.1:5000/api/stream");
        assert_eq!(client.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn excel_simulation_is_refused_locally() {
        let client = ApiClient::from_config(&BackendConfig::default());
        assert!(client.export_simulate(ExportFormat::Excel, 7).is_err());
    }
}
