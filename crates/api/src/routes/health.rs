use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Connected status observers.
    pub observers: usize,
    pub pool_size: usize,
    /// Jobs currently being processed.
    pub in_flight: usize,
}

/// GET /health -- returns service status and pool occupancy.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        observers: state.observers.connection_count().await,
        pool_size: state.supervisor.pool_size(),
        in_flight: state.supervisor.in_flight(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
