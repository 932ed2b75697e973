//! Shared API state

use sloggo_store::LogStore;

/// State threaded through every handler
#[derive(Clone)]
pub struct AppState {
    /// The embedded log store (reader pool side)
    pub store: LogStore,

    /// Log per-query timings on the logs endpoint
    pub debug: bool,
}

impl AppState {
    /// Create new state over a store
    pub fn new(store: LogStore, debug: bool) -> Self {
        Self { store, debug }
    }
}
