//! Client-local preferences, persisted to `~/.co2dash/prefs.json`.
//!
//! Only one preference exists today: whether threshold alerts ring the
//! terminal bell. Loading is best-effort; a missing or unreadable file
//! yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub audio_alerts: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { audio_alerts: true }
    }
}

impl Preferences {
    pub fn load() -> Self {
        prefs_path()
            .and_then(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = prefs_path().context("could not determine home directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

pub fn prefs_path() -> Option<PathBuf> {
    crate::config::data_dir().map(|d| d.join("prefs.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_file() {
        let dir = std::env::temp_dir().join(format!("co2dash-prefs-{}", std::process::id()));
        let path = dir.join("prefs.json");
        let prefs = Preferences {
            audio_alerts: false,
        };
        prefs.save_to(&path).unwrap();
        assert_eq!(Preferences::load_from(&path), Some(prefs));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("co2dash-prefs-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prefs.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(Preferences::load_from(&path), None);
        assert!(Preferences::default().audio_alerts);
        let _ = fs::remove_dir_all(&dir);
    }
}
