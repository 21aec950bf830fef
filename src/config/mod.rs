//! Configuration system for co2dash.
//!
//! Provides a layered configuration hierarchy:
//!
//! 1. **Built-in defaults**: hardcoded in [`schema::DashConfig::default()`]
//! 2. **User global config**: `~/.co2dash/config.toml`
//! 3. **Project local config**: `.co2dash.toml` in the current working directory
//! 4. **Environment variables**: `CO2DASH_*` overrides (highest precedence)
//!
//! Later layers replace earlier ones. Missing sections in a TOML file fall
//! back to built-in defaults.
//!
//! This only covers the client. Thresholds, update speeds and the analysis
//! flag live on the backend and are fetched through [`crate::api`].

pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::DashConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> DashConfig {
    let mut config = DashConfig::default();

    if let Some(global) = load_toml_file(global_config_path()) {
        config = global;
    }

    if let Some(project) = load_toml_file(project_config_path()) {
        config = project;
    }

    apply_env_overrides(&mut config);

    config.backend.base_url = config.backend.base_url.trim_end_matches('/').to_string();
    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Malformed files are ignored; the dashboard must still come up against the
/// default backend.
fn load_toml_file(path: Option<PathBuf>) -> Option<DashConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// `~/.co2dash`, home of the config, the event log and the preferences.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".co2dash"))
}

fn global_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".co2dash.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Supported variables:
/// - `CO2DASH_URL`: backend base URL
/// - `CO2DASH_TIMEOUT_MS`: per-request timeout
/// - `CO2DASH_TRANSPORT`: `auto`, `push` or `poll`
/// - `CO2DASH_LOG`: event log on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut DashConfig) {
    if let Ok(val) = std::env::var("CO2DASH_URL")
        && !val.is_empty()
    {
        config.backend.base_url = val;
    }
    if let Ok(val) = std::env::var("CO2DASH_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("CO2DASH_TRANSPORT")
        && let Some(mode) = parse_transport(&val)
    {
        config.live.transport = mode;
    }
    if let Ok(val) = std::env::var("CO2DASH_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
pub fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a transport mode string.
pub fn parse_transport(val: &str) -> Option<schema::TransportMode> {
    match val.to_ascii_lowercase().as_str() {
        "auto" => Some(schema::TransportMode::Auto),
        "push" | "sse" | "stream" => Some(schema::TransportMode::Push),
        "poll" | "polling" => Some(schema::TransportMode::Poll),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.co2dash/config.toml`.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.co2dash/ directory")?;
    }

    fs::write(&path, DashConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key (dotted, e.g. `backend.base_url`) in the global
/// config file, creating it from defaults when missing.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&DashConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut value_table, key, value)?;

    // Reject edits that would make the file unloadable.
    let output =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;
    toml::from_str::<DashConfig>(&output)
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            if leaf.ends_with("_interval_ms") && n <= 0 {
                anyhow::bail!("'{key}' must be at least 1 ms");
            }
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert((*leaf).to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("YES"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn parse_transport_handles_variants() {
        assert_eq!(parse_transport("auto"), Some(schema::TransportMode::Auto));
        assert_eq!(parse_transport("SSE"), Some(schema::TransportMode::Push));
        assert_eq!(parse_transport("polling"), Some(schema::TransportMode::Poll));
        assert_eq!(parse_transport("carrier-pigeon"), None);
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root: toml::Value =
            toml::from_str("[backend]\nbase_url = \"http://a\"\n").unwrap();
        set_toml_value(&mut root, "backend.base_url", "http://b:5000").unwrap();
        assert_eq!(root["backend"]["base_url"].as_str(), Some("http://b:5000"));
    }

    #[test]
    fn set_toml_value_updates_integer_and_bool() {
        let mut root: toml::Value =
            toml::from_str("[live]\nmax_points = 25\n[logging]\nenabled = true\n").unwrap();
        set_toml_value(&mut root, "live.max_points", "40").unwrap();
        set_toml_value(&mut root, "logging.enabled", "off").unwrap();
        assert_eq!(root["live"]["max_points"].as_integer(), Some(40));
        assert_eq!(root["logging"]["enabled"].as_bool(), Some(false));
    }

    #[test]
    fn set_toml_value_rejects_zero_intervals() {
        let mut root: toml::Value =
            toml::from_str("[sync]\nstate_sync_interval_ms = 2000\n").unwrap();
        assert!(set_toml_value(&mut root, "sync.state_sync_interval_ms", "0").is_err());
        assert!(set_toml_value(&mut root, "sync.state_sync_interval_ms", "-5").is_err());
        set_toml_value(&mut root, "sync.state_sync_interval_ms", "1").unwrap();
        assert_eq!(root["sync"]["state_sync_interval_ms"].as_integer(), Some(1));
    }

    #[test]
    fn set_toml_value_rejects_unknown_keys() {
        let mut root: toml::Value = toml::from_str("[live]\nmax_points = 25\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "1").is_err());
        assert!(set_toml_value(&mut root, "live.nope", "1").is_err());
        assert!(set_toml_value(&mut root, "live.max_points", "many").is_err());
    }

    #[test]
    fn show_effective_config_round_trips() {
        let toml_str = show_effective_config().unwrap();
        let _: DashConfig = toml::from_str(&toml_str).unwrap();
    }
}
