//! Application state
//!
//! Shared state for the admin handlers: the config id registry and the
//! session manager, both process-scoped and injected at construction
//! rather than reached through globals.

use std::sync::Arc;

use tapwire_core::{ConfigIdRegistry, TapSessionManager};

/// State shared by the admin route handlers
#[derive(Clone)]
pub struct AppState {
    /// Registry backing `/tap/config_ids` and attach validation
    pub registry: Arc<ConfigIdRegistry>,
    /// Owner of the single admin tap session
    pub sessions: Arc<TapSessionManager>,
}

impl AppState {
    /// Build the state pair from a registry
    pub fn new(registry: Arc<ConfigIdRegistry>) -> Self {
        let sessions = TapSessionManager::new(Arc::clone(&registry));
        Self { registry, sessions }
    }
}
