//! Health check endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Registers health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    database: &'static str,
}

/// Reports liveness and whether the store answers.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.store.ping().await {
        "connected"
    } else {
        "disconnected"
    };
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
        database,
    })
}
