use crate::{AppState, config::BackendMode};
use axum::{Json, extract::State};
use chrono::Utc;

/// GET /health
/// Reports which backend the service is reading from.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let backend = match state.config.backend {
        BackendMode::Remote { .. } => "remote",
        BackendMode::Memory => "memory",
    };

    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "status": "healthy",
        "backend": backend,
        "time": Utc::now().to_rfc3339(),
    }))
}
