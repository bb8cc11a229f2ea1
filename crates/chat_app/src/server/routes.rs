use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chat_engine::Relay;
use chat_logging::{chat_debug, chat_warn};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::ApiError;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    relay: Relay,
    /// Parent of every per-request token; cancelling it ends open streams.
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(relay: Relay, shutdown: CancellationToken) -> Self {
        Self { relay, shutdown }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .with_state(state)
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "model": state.relay.model() }))
}

/// `POST /api/chat`: streams the reply as plain UTF-8 text.
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadBody(rejection.body_text()))?;
    let prompt = request.prompt.unwrap_or_default();

    let stream = state
        .relay
        .start(&prompt, state.shutdown.child_token())
        .await?;
    chat_debug!("streaming reply for prompt_len={}", prompt.len());

    let stream = stream.inspect_err(|err| chat_warn!("aborting reply body: {err}"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
