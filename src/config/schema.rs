//! Configuration schema and defaults for the co2dash client.
//!
//! Defines the TOML-serializable configuration structure with all sections:
//! `[backend]`, `[live]`, `[sync]`, `[overview]`, `[settings]`, `[alerts]`,
//! `[logging]`, and `[web]`.
//!
//! Every field has a sensible built-in default. Users only need to set the
//! values they want to override.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level co2dash configuration.
///
/// Maps directly to the `~/.co2dash/config.toml` and `.co2dash.toml` file
/// schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub backend: BackendConfig,
    pub live: LiveConfig,
    pub sync: SyncConfig,
    pub overview: OverviewConfig,
    pub settings: SettingsConfig,
    pub alerts: AlertsConfig,
    pub logging: LoggingConfig,
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Where the CO₂ backend lives and how patient we are with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, without trailing slash.
    pub base_url: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
    /// Path of the server-sent events stream.
    pub push_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 5000,
            push_path: "/api/stream".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// [live]
// ---------------------------------------------------------------------------

/// Which transport drives the live page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    /// Prefer the push stream, fall back to polling when it is unavailable.
    #[default]
    Auto,
    /// Push stream only; no polling fallback.
    Push,
    /// Never open the push stream.
    Poll,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Push => write!(f, "push"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

/// Live page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub transport: TransportMode,
    /// Maximum number of points kept in the chart series.
    pub max_points: usize,
    /// Fallback poll interval until the backend reports `update_speed`.
    pub poll_interval_ms: u64,
    /// Duration of the numeric readout animation.
    pub value_animation_ms: u64,
    /// Redraw cadence while an animation is running.
    pub frame_interval_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::default(),
            max_points: 25,
            poll_interval_ms: 1000,
            value_animation_ms: 450,
            frame_interval_ms: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// [sync]
// ---------------------------------------------------------------------------

/// Shared-state re-sync cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub state_sync_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_sync_interval_ms: 2000,
        }
    }
}

// ---------------------------------------------------------------------------
// [overview]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewConfig {
    /// Used until the backend reports `overview_update_speed`.
    pub refresh_interval_ms: u64,
    /// Duration of the "current CO₂" sub-value animation.
    pub value_animation_ms: u64,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5000,
            value_animation_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// [settings]
// ---------------------------------------------------------------------------

/// Settings panel behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Quiet period after the last edit before autosave fires.
    pub autosave_debounce_ms: u64,
    /// How long a toast stays on screen.
    pub toast_ms: u64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 800,
            toast_ms: 2000,
        }
    }
}

// ---------------------------------------------------------------------------
// [alerts]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Number of alerts kept in the panel (newest first).
    pub max_entries: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self { max_entries: 20 }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append events to `~/.co2dash/events.jsonl`.
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address of the embedded HTML dashboard.
    pub addr: String,
    /// `<meta http-equiv="refresh">` period in seconds.
    pub refresh_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9750".to_string(),
            refresh_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl DashConfig {
    /// The annotated TOML written by `co2dash config init`.
    pub fn default_toml() -> String {
        r#"# co2dash configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (CO2DASH_*)
#   2. Project config (.co2dash.toml in current directory)
#   3. User global config (~/.co2dash/config.toml)
#   4. Built-in defaults

[backend]
base_url = "http://127.0.0.1:5000"
timeout_ms = 5000
push_path = "/api/stream"

[live]
transport = "auto"        # auto | push | poll
max_points = 25
poll_interval_ms = 1000   # replaced by the backend's update_speed once known
value_animation_ms = 450
frame_interval_ms = 50

[sync]
state_sync_interval_ms = 2000

[overview]
refresh_interval_ms = 5000   # replaced by the backend's overview_update_speed
value_animation_ms = 500

[settings]
autosave_debounce_ms = 800
toast_ms = 2000

[alerts]
max_entries = 20

[logging]
enabled = true

[web]
addr = "127.0.0.1:9750"
refresh_secs = 5
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
