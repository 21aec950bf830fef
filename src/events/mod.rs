//! Event log: one JSONL line per notable thing the dashboard does.
//!
//! Records transport switches, sync failures, saves and exports so that a
//! misbehaving backend can be diagnosed after the fact. Writing is
//! best-effort: I/O failures are ignored and never reach the UI.
//!
//! Log file: `~/.co2dash/events.jsonl`

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use colored::Colorize;
use serde::{Deserialize, Serialize};

static ENABLED: AtomicBool = AtomicBool::new(true);
static ECHO_STDERR: AtomicBool = AtomicBool::new(true);

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// A single line in `events.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: String,
    pub level: Level,
    /// Subsystem that emitted the event (`sync`, `live`, `push`, ...).
    pub source: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Switches
// ---------------------------------------------------------------------------

/// Turn file logging on or off for the rest of the process.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

/// Full-screen sessions show warnings in their status line instead of
/// writing over the frame.
pub fn set_stderr_echo(echo: bool) {
    ECHO_STDERR.store(echo, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

pub fn info(source: &str, message: impl Into<String>) {
    record(Level::Info, source, message.into());
}

/// Log a warning and echo it to stderr (unless a session owns the screen).
pub fn warn(source: &str, message: impl Into<String>) {
    let message = message.into();
    if ECHO_STDERR.load(Ordering::Relaxed) {
        eprintln!("{} [{}] {}", "warning:".yellow().bold(), source, message);
    }
    record(Level::Warn, source, message);
}

fn record(level: Level, source: &str, message: String) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let entry = EventEntry {
        timestamp: Utc::now().to_rfc3339(),
        level,
        source: source.to_string(),
        message,
    };
    let _ = append_event(&entry);
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// The last `n` entries, oldest first. Malformed lines are skipped.
pub fn read_recent(n: usize) -> Vec<EventEntry> {
    let Some(path) = events_log_path() else {
        return Vec::new();
    };
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    let entries: Vec<EventEntry> = BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect();

    let skip = entries.len().saturating_sub(n);
    entries.into_iter().skip(skip).collect()
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_event(entry: &EventEntry) -> anyhow::Result<()> {
    let Some(path) = events_log_path() else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Return the path to the event log file.
pub fn events_log_path() -> Option<PathBuf> {
    crate::config::data_dir().map(|dir| dir.join("events.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_level_lowercase() {
        let entry = EventEntry {
            timestamp: "2026-01-01T00:00:00+00:00".to_string(),
            level: Level::Warn,
            source: "sync".to_string(),
            message: "settings fetch failed".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"level\":\"warn\""));
        let back: EventEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.level, Level::Warn);
    }
}
