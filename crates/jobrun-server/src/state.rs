//! Shared application state.

use std::sync::Arc;

use jobrun_engine::JobEngine;

/// Shared application state.
pub struct AppState {
    /// The embedded engine this server fronts.
    pub engine: JobEngine,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(engine: JobEngine) -> Arc<Self> {
        Arc::new(Self { engine })
    }
}
