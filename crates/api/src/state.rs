//! Shared application state for the Axum API server.

use std::sync::Arc;

use pushcast_engine::{Dispatcher, Registry};

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub dispatcher: Arc<Dispatcher>,
    pub vapid_public_key: Option<String>,
}

impl AppState {
    pub fn new(
        registry: Arc<Registry>,
        dispatcher: Arc<Dispatcher>,
        vapid_public_key: Option<String>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            vapid_public_key,
        }
    }
}
