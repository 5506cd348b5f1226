//! Dispatch bridge: a thin producer onto the dispatch topic.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cipherq_core::validation::Validator;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub job_id: String,
    pub topic: String,
}

/// POST /api/v1/dispatch -- validate a Job Message and publish it verbatim.
///
/// Invalid messages are rejected with 400 and never reach the bus.
pub async fn dispatch_job(
    State(state): State<AppState>,
    body: String,
) -> AppResult<(StatusCode, Json<DispatchResponse>)> {
    let job = Validator::check(&body)?;
    let topic = state.config.worker.dispatch_topic.clone();

    state.bus.publish(&topic, body).await?;
    tracing::info!(job_id = %job.job_id, topic = %topic, "Job dispatched");

    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchResponse {
            job_id: job.job_id,
            topic,
        }),
    ))
}
