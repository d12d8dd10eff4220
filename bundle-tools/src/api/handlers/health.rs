use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::api::router::AppState;

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "serveb",
            "version": env!("CARGO_PKG_VERSION"),
            "entries": state.index.len(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
