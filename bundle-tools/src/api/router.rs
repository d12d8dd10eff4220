use axum::{routing::get, Router};
use bundle::Index;
use std::sync::Arc;

use crate::api::handlers::{entry_handler, health_handler, list_handler};

/// Application state container
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<Index>,
    /// Bytes per body chunk when streaming an entry
    pub chunk_size: usize,
}

impl AppState {
    pub fn new(index: Index, chunk_size: usize) -> Self {
        Self {
            index: Arc::new(index),
            chunk_size,
        }
    }
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_handler))
        .route("/health", get(health_handler))
        .route("/{*name}", get(entry_handler))
        .with_state(state)
}
