//! Error types for the control API.
//!
//! [`ApiError`] can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the control API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested control action is disabled by configuration.
    #[error("control disabled: {0}")]
    ControlDisabled(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::ControlDisabled(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
