//! HTTP error mapping for the relay routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_engine::{FailureKind, StreamError};
use chat_logging::{chat_error, chat_warn};
use serde_json::json;

/// Failures that end a chat request before any reply bytes were sent.
///
/// Failures after the first byte cannot change the status line; they abort
/// the chunked body instead.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request body has no usable prompt: {0}")]
    BadBody(String),

    #[error(transparent)]
    Relay(#[from] StreamError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadBody(_)
            | ApiError::Relay(StreamError {
                kind: FailureKind::InvalidInput,
                ..
            }) => {
                chat_warn!("chat request rejected: {self}");
                (StatusCode::BAD_REQUEST, "prompt is required")
            }
            ApiError::Relay(err) => {
                chat_error!("chat request failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "server error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
