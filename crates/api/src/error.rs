use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cipherq_core::validation::ValidationError;
use cipherq_events::BusError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The submitted Job Message failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The message bus refused the publish.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string()),
            AppError::Bus(BusError::Closed) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SHUTTING_DOWN",
                "The dispatch bus is closed".to_string(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
