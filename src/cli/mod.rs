//! One-shot CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `co2dash history today|latest N`: readings as a table, JSON or CSV
//! - `co2dash analytics ...`: predictions, anomalies, insights, recommendations
//! - `co2dash cleanup --days N`: purge old readings on the backend
//! - `co2dash export ...`: simulated, scheduled, daily CSV and PDF exports
//! - `co2dash alerts audio on|off|status`: audio alert preference
//! - `co2dash settings show|set|reset`: backend settings
//! - `co2dash health`: config, backend, push channel, preferences
//! - `co2dash config show|init|set|reset`: configuration management
//! - `co2dash log`: recent entries of the event log
//!
//! The interactive sessions (`live`, `overview`, `settings edit`, `web`)
//! live in their own modules.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;

use crate::alerts::prefs::{self, Preferences};
use crate::api::types::{ExportFormat, ExportOutcome, Frequency, Reading};
use crate::api::{ApiClient, Backend};
use crate::config::{self, DashConfig};
use crate::display;
use crate::events::{self, EventEntry, Level};
use crate::overview;
use crate::settings;
use crate::state::quality::Thresholds;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

fn client(config: &DashConfig) -> ApiClient {
    ApiClient::from_config(&config.backend)
}

/// Print the red "could not load" line the dashboards show for a failed
/// fetch, and record it.
fn could_not_load(what: &str, err: &anyhow::Error) {
    events::warn("cli", format!("could not load {what}: {err:#}"));
    println!("{} {}", "✗".red().bold(), format!("could not load {what}").red());
    println!("  {}", format!("{err:#}").dimmed());
}

// ---------------------------------------------------------------------------
// co2dash history
// ---------------------------------------------------------------------------

/// Which slice of history to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    Today,
    Latest(usize),
}

pub fn run_history(config: &DashConfig, range: HistoryRange, format: OutputFormat) -> Result<()> {
    let client = client(config);
    let readings = match range {
        HistoryRange::Today => client.history_today()?,
        HistoryRange::Latest(n) => client.history_latest(n)?,
    };

    if readings.is_empty() {
        println!("{}", "No readings yet.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_history_json(&readings)?,
        OutputFormat::Csv => print!("{}", overview::stats::day_csv(&readings)),
        OutputFormat::Table => {
            // Colors follow the backend's thresholds when it answers.
            let thresholds = client
                .fetch_settings()
                .map(|s| s.thresholds)
                .unwrap_or_default();
            print_history_table(&readings, range, thresholds);
        }
    }
    Ok(())
}

fn print_history_table(readings: &[Reading], range: HistoryRange, thresholds: Thresholds) {
    let title = match range {
        HistoryRange::Today => "CO₂ Readings Today".to_string(),
        HistoryRange::Latest(n) => format!("Latest {n} CO₂ Readings"),
    };
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(44));
    println!("  {:<22} {:>8} {:>10}", "Time", "ppm", "Quality");
    println!("  {}", "-".repeat(42));

    for r in readings {
        let quality = thresholds.classify(r.ppm);
        let line = format!(
            "  {:<22} {:>8} {:>10}",
            r.at.format("%Y-%m-%d %H:%M:%S"),
            r.ppm,
            quality.label()
        );
        println!("{}", display::paint(&line, quality.color()));
    }

    let values: Vec<u32> = readings.iter().map(|r| r.ppm).collect();
    println!();
    println!("  {}", display::sparkline(&values, thresholds));
}

fn print_history_json(readings: &[Reading]) -> Result<()> {
    let values: Vec<serde_json::Value> = readings
        .iter()
        .map(|r| serde_json::json!({ "timestamp": r.timestamp, "ppm": r.ppm }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// co2dash analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsView {
    Predictions { hours: u32 },
    Anomalies,
    Insights,
    Recommendations,
}

/// Render one of the read-only feature payloads. A failed fetch prints the
/// "could not load" line and is not an error.
pub fn run_analytics(config: &DashConfig, view: AnalyticsView, format: OutputFormat) -> Result<()> {
    let client = client(config);
    let json = format == OutputFormat::Json;

    match view {
        AnalyticsView::Predictions { hours } => match client.predictions(hours) {
            Ok(list) if json => println!("{}", serde_json::to_string_pretty(&list)?),
            Ok(list) => {
                println!("{}", format!("CO₂ Predictions — Next {hours} Hours").bold().cyan());
                println!("{}", "=".repeat(44));
                println!("  {:<8} {:>12} {:>12}", "Hour", "Predicted", "Confidence");
                println!("  {}", "-".repeat(42));
                for p in &list {
                    println!(
                        "  {:<8} {:>8.0} ppm {:>11.0}%",
                        format!("+{}h", p.hour),
                        p.predicted_co2,
                        p.confidence * 100.0
                    );
                }
            }
            Err(e) => could_not_load("predictions", &e),
        },
        AnalyticsView::Anomalies => match client.anomalies() {
            Ok(list) if json => println!("{}", serde_json::to_string_pretty(&list)?),
            Ok(list) => {
                println!("{}", "Detected Anomalies".bold().cyan());
                println!("{}", "=".repeat(44));
                if list.is_empty() {
                    println!("  {}", "No anomalies detected.".green());
                }
                for a in &list {
                    let severity = match a.severity.as_str() {
                        "high" => a.severity.red().bold(),
                        "medium" => a.severity.yellow(),
                        _ => a.severity.normal(),
                    };
                    println!("  [{}] {} ({:.0} ppm)", severity, a.description, a.value);
                    println!("       {}", format!("{} · {}", a.kind, a.timestamp).dimmed());
                }
            }
            Err(e) => could_not_load("anomalies", &e),
        },
        AnalyticsView::Insights => match client.insights() {
            Ok(list) if json => println!("{}", serde_json::to_string_pretty(&list)?),
            Ok(list) => {
                println!("{}", "Insights".bold().cyan());
                println!("{}", "=".repeat(44));
                for i in &list {
                    println!("  {} {}", i.title.bold(), format!("({} impact)", i.impact).dimmed());
                    println!("    {}", i.description);
                    println!("    {} {}", "→".cyan(), i.recommendation);
                }
            }
            Err(e) => could_not_load("insights", &e),
        },
        AnalyticsView::Recommendations => match client.recommendations() {
            Ok(list) if json => println!("{}", serde_json::to_string_pretty(&list)?),
            Ok(list) => {
                println!("{}", "Health Recommendations".bold().cyan());
                println!("{}", "=".repeat(44));
                for r in &list {
                    println!(
                        "  {:<10} {:<14} {}",
                        r.priority,
                        truncate(&r.category, 14),
                        r.title.bold()
                    );
                    println!("    {}", r.description.dimmed());
                }
            }
            Err(e) => could_not_load("recommendations", &e),
        },
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// co2dash cleanup
// ---------------------------------------------------------------------------

pub fn run_cleanup(config: &DashConfig, days: u32, assume_yes: bool) -> Result<()> {
    if days == 0 {
        anyhow::bail!("--days must be at least 1");
    }
    let prompt = format!("Delete all readings older than {days} days?");
    if !settings::confirm(&prompt, assume_yes)? {
        println!("{}", "Cancelled.".dimmed());
        return Ok(());
    }

    let deleted = client(config).cleanup(days).context("cleanup failed")?;
    events::info("cleanup", format!("{deleted} readings older than {days} days deleted"));
    println!(
        "{} {} readings deleted",
        "✓".green().bold(),
        format_number(deleted)
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// co2dash export
// ---------------------------------------------------------------------------

pub fn run_export_simulate(
    config: &DashConfig,
    format: &str,
    days: u32,
    out: Option<&Path>,
) -> Result<()> {
    let format = ExportFormat::parse(format)?;
    let outcome = client(config).export_simulate(format, days)?;

    match outcome {
        ExportOutcome::Csv(body) => match out {
            Some(path) => {
                write_file(path, body.as_bytes())?;
                let rows = body.lines().count().saturating_sub(1);
                println!(
                    "{} {} rows written to {}",
                    "✓".green().bold(),
                    format_number(rows as u64),
                    path.display()
                );
            }
            None => print!("{body}"),
        },
        ExportOutcome::Json(summary) => {
            println!("{}", "Simulated Export".bold().cyan());
            println!("{}", "=".repeat(40));
            println!("  {} {}", "Records:    ".bold(), format_number(summary.records));
            println!("  {} {} days", "Period:     ".bold(), summary.period_days);
            if let Some(date) = &summary.export_date {
                println!("  {} {}", "Exported at:".bold(), date);
            }
            if let Some(path) = out {
                let json = serde_json::to_string_pretty(&summary.data)?;
                write_file(path, json.as_bytes())?;
                println!("{} data written to {}", "✓".green().bold(), path.display());
            }
        }
    }
    Ok(())
}

pub fn run_export_schedule(config: &DashConfig, format: &str, frequency: &str) -> Result<()> {
    let format = ExportFormat::parse(format)?;
    let frequency = Frequency::parse(frequency)?;
    client(config).schedule_export(format, frequency)?;
    events::info(
        "export",
        format!("scheduled {} export ({})", format.as_str(), frequency.as_str()),
    );
    println!(
        "{} Scheduled {} export, {}",
        "✓".green().bold(),
        format.as_str(),
        frequency.as_str()
    );
    Ok(())
}

pub fn run_export_scheduled(config: &DashConfig) -> Result<()> {
    let exports = client(config).scheduled_exports()?;
    if exports.is_empty() {
        println!("{}", "No scheduled exports.".yellow());
        return Ok(());
    }
    println!("{}", "Scheduled Exports".bold().cyan());
    println!("{}", "=".repeat(50));
    println!("  {:<6} {:<8} {:<10} Next run", "ID", "Format", "Frequency");
    println!("  {}", "-".repeat(48));
    for e in &exports {
        println!(
            "  {:<6} {:<8} {:<10} {}",
            e.id,
            e.format,
            e.frequency,
            e.next_execution.as_deref().unwrap_or(display::PLACEHOLDER)
        );
    }
    Ok(())
}

pub fn run_export_unschedule(config: &DashConfig, id: i64) -> Result<()> {
    client(config).delete_scheduled_export(id)?;
    events::info("export", format!("scheduled export {id} removed"));
    println!("{} Removed scheduled export {}", "✓".green().bold(), id);
    Ok(())
}

/// Today's readings as `time,ppm` CSV.
pub fn run_export_today(config: &DashConfig, out: Option<PathBuf>) -> Result<()> {
    let path = out.unwrap_or_else(default_today_path);
    let count = overview::export_day_csv(&client(config), &path)?;
    println!(
        "{} {} readings written to {}",
        "✓".green().bold(),
        format_number(count as u64),
        path.display()
    );
    Ok(())
}

/// Download the daily PDF report.
pub fn run_export_pdf(config: &DashConfig, out: &Path) -> Result<()> {
    let bytes = client(config).daily_report_pdf()?;
    write_file(out, &bytes)?;
    events::info("export", format!("daily report saved to {}", out.display()));
    println!(
        "{} Daily report ({} bytes) saved to {}",
        "✓".green().bold(),
        format_number(bytes.len() as u64),
        out.display()
    );
    Ok(())
}

fn default_today_path() -> PathBuf {
    PathBuf::from(format!("co2_today_{}.csv", Local::now().format("%Y-%m-%d")))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

// ---------------------------------------------------------------------------
// co2dash alerts audio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioAction {
    On,
    Off,
    Status,
}

pub fn run_alerts_audio(action: AudioAction) -> Result<()> {
    let mut prefs = Preferences::load();
    match action {
        AudioAction::Status => {}
        AudioAction::On | AudioAction::Off => {
            prefs.audio_alerts = action == AudioAction::On;
            let path = prefs.save()?;
            events::info("alerts", format!("audio alerts set to {}", prefs.audio_alerts));
            println!("{} Saved to {}", "✓".green().bold(), path.display());
        }
    }
    println!(
        "  {} {}",
        "Audio alerts:".bold(),
        if prefs.audio_alerts { "on".green() } else { "off".yellow() }
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// co2dash settings show | set | reset
// ---------------------------------------------------------------------------

pub fn run_settings_show(config: &DashConfig) -> Result<()> {
    settings::show(&client(config))
}

pub fn run_settings_set(config: &DashConfig, key: &str, value: &str) -> Result<()> {
    let panel = settings::set(&client(config), key, value)?;
    println!("{} Saved {} = {}", "✓".green().bold(), key.bold(), value);
    println!("{}", settings::render_panel(&panel).join("\n"));
    Ok(())
}

pub fn run_settings_reset(config: &DashConfig, assume_yes: bool) -> Result<()> {
    if !settings::confirm("Restore the backend's default settings?", assume_yes)? {
        println!("{}", "Cancelled.".dimmed());
        return Ok(());
    }
    let client = client(config);
    client.reset_settings().context("could not reset settings")?;
    events::info("settings", "settings reset to defaults");
    println!("{} Settings reset to defaults", "✓".green().bold());
    settings::show(&client)
}

// ---------------------------------------------------------------------------
// co2dash health
// ---------------------------------------------------------------------------

/// Check config files, backend, settings, push channel and preferences.
pub fn run_health() -> Result<()> {
    println!("{}", "co2dash Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    // 0. Config file status
    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.co2dash/config.toml found"
        } else {
            "not found (run `co2dash config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".co2dash.toml found"
        } else {
            "none (optional)"
        },
    );

    // 1. Backend
    let client = client(&cfg);
    let reachable = client.is_reachable();
    print_health_item(
        "Backend",
        reachable,
        &if reachable {
            format!("reachable at {}", client.base_url())
        } else {
            format!("not reachable at {}", client.base_url())
        },
    );

    if reachable {
        // 2. Settings payload
        match client.fetch_settings() {
            Ok(s) => print_health_item(
                "Settings",
                true,
                &format!(
                    "good {} / warning {} / bad {} ppm, analysis {}",
                    s.thresholds.good(),
                    s.warning_threshold,
                    s.thresholds.bad(),
                    if s.analysis_running { "running" } else { "paused" }
                ),
            ),
            Err(e) => print_health_item("Settings", false, &format!("{e:#}")),
        }

        // 3. Push channel
        let push_ok = client.push_available();
        print_health_item(
            "Push channel",
            push_ok,
            &if push_ok {
                format!("{} ({})", client.push_url(), cfg.live.transport)
            } else {
                format!("unavailable, live view will poll ({})", cfg.live.transport)
            },
        );
    }

    // 4. Preferences
    let prefs_path = prefs::prefs_path();
    let prefs_exists = prefs_path.as_ref().map(|p| p.exists()).unwrap_or(false);
    let prefs = Preferences::load();
    print_health_item(
        "Preferences",
        true,
        &format!(
            "audio alerts {}{}",
            if prefs.audio_alerts { "on" } else { "off" },
            if prefs_exists { "" } else { " (default)" }
        ),
    );

    // 5. Event log
    let log_exists = events::events_log_path()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Event log",
        cfg.logging.enabled,
        if !cfg.logging.enabled {
            "disabled"
        } else if log_exists {
            "~/.co2dash/events.jsonl"
        } else {
            "no log file yet"
        },
    );

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// co2dash config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective co2dash Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.co2dash/config.toml", global_exists);
    print_source(".co2dash.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "CO2DASH_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.co2dash/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!("  {}", "Edit the file to point co2dash at your backend.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// co2dash log
// ---------------------------------------------------------------------------

pub fn run_log(tail: usize, format: OutputFormat) -> Result<()> {
    let entries = events::read_recent(tail);
    if entries.is_empty() {
        println!("{}", "No events logged yet.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Csv => {
            println!("timestamp,level,source,message");
            for e in &entries {
                println!(
                    "{},{},{},\"{}\"",
                    e.timestamp,
                    e.level,
                    e.source,
                    e.message.replace('"', "\"\"")
                );
            }
        }
        OutputFormat::Table => print_log_table(&entries),
    }
    Ok(())
}

fn print_log_table(entries: &[EventEntry]) {
    println!("{}", "Recent Events".bold().cyan());
    println!("{}", "=".repeat(60));
    for e in entries {
        let time = chrono::DateTime::parse_from_rfc3339(&e.timestamp)
            .map(|t| t.with_timezone(&Local).format("%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| truncate(&e.timestamp, 14));
        let level = match e.level {
            Level::Info => "info".normal(),
            Level::Warn => "warn".yellow().bold(),
        };
        println!(
            "  {} {:<4} {:<9} {}",
            time.dimmed(),
            level,
            e.source,
            e.message
        );
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(42), "42");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("ventilation", 4), "ven…");
        assert_eq!(truncate("CO₂ level", 3), "CO…");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }

    #[test]
    fn default_today_path_is_dated_csv() {
        let path = default_today_path();
        let name = path.to_string_lossy();
        assert!(name.starts_with("co2_today_"));
        assert!(name.ends_with(".csv"));
    }
}
