pub mod dispatch;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// POST /dispatch     validate a Job Message and publish it
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/dispatch", post(dispatch::dispatch_job))
}

/// Root-level observer channel (`/ws-status`).
pub fn observer_routes() -> Router<AppState> {
    Router::new().route("/ws-status", get(ws::ws_status_handler))
}
