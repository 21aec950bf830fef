//! Shared dashboard state.
//!
//! Every page reads the same thresholds and analysis flag. They are held in
//! a [`StateStore`] owned by the session loop and handed out by reference;
//! writes always replace the whole snapshot and bump a revision counter, so
//! the last write wins regardless of which timer or push event made it.

pub mod quality;
pub mod sync;

use crate::api::types::SettingsSnapshot;
use quality::Thresholds;

/// Who wrote the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSource {
    Startup,
    Sync,
    Push,
    SettingsPanel,
}

/// What a write changed, so the caller can reschedule timers or redraw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateChange {
    pub thresholds: bool,
    pub analysis_running: bool,
    pub update_speed: bool,
    pub overview_update_speed: bool,
}

impl StateChange {
    pub fn any(&self) -> bool {
        self.thresholds || self.analysis_running || self.update_speed || self.overview_update_speed
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    settings: SettingsSnapshot,
    /// `true` once a snapshot has come from the backend.
    loaded: bool,
    revision: u64,
    last_source: WriteSource,
}

impl Default for StateStore {
    fn default() -> Self {
        Self {
            settings: SettingsSnapshot::default(),
            loaded: false,
            revision: 0,
            last_source: WriteSource::Startup,
        }
    }
}

impl StateStore {
    pub fn thresholds(&self) -> Thresholds {
        self.settings.thresholds
    }

    pub fn analysis_running(&self) -> bool {
        self.settings.analysis_running
    }

    pub fn settings(&self) -> &SettingsSnapshot {
        &self.settings
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn last_source(&self) -> WriteSource {
        self.last_source
    }

    /// Replace the whole snapshot.
    pub fn replace(&mut self, settings: SettingsSnapshot, source: WriteSource) -> StateChange {
        let old = &self.settings;
        let change = StateChange {
            thresholds: old.thresholds != settings.thresholds,
            analysis_running: old.analysis_running != settings.analysis_running,
            update_speed: old.update_speed_secs != settings.update_speed_secs,
            overview_update_speed: old.overview_update_speed_secs
                != settings.overview_update_speed_secs,
        };
        self.settings = settings;
        self.loaded = true;
        self.revision += 1;
        self.last_source = source;
        change
    }

    /// Apply an `analysis-state-change` push, which only carries the flag.
    pub fn set_analysis_running(&mut self, running: bool, source: WriteSource) -> StateChange {
        let mut next = self.settings.clone();
        next.analysis_running = running;
        let loaded = self.loaded;
        let change = self.replace(next, source);
        self.loaded = loaded;
        change
    }
}
