//! Settings fetch and the periodic state watcher.
//!
//! `load_settings` is called once at startup and then on every watcher
//! tick. Each tick is independent: no back-off, no comparison with what a
//! push event may have written in between. A failed fetch leaves the store
//! untouched and only logs a warning.

use super::{StateChange, StateStore, WriteSource};
use crate::api::Backend;
use crate::events;

/// Fetch settings and replace the shared snapshot.
///
/// Returns `None` when the fetch failed; the previous values stay in place.
pub fn load_settings<B: Backend + ?Sized>(
    backend: &B,
    store: &mut StateStore,
    source: WriteSource,
) -> Option<StateChange> {
    match backend.fetch_settings() {
        Ok(settings) => Some(store.replace(settings, source)),
        Err(e) => {
            events::warn("sync", format!("failed to load settings: {e:#}"));
            None
        }
    }
}

/// One state-watcher tick.
pub fn tick<B: Backend + ?Sized>(backend: &B, store: &mut StateStore) -> Option<StateChange> {
    load_settings(backend, store, WriteSource::Sync)
}
