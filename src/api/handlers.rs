//! HTTP request handlers
//!
//! Every failure answers 500 with an `{"error": ...}` body.

use super::sse::{frame_response, STREAM_FAILURE_MESSAGE};
use super::types::{ChatRequest, ChatResponse, ErrorResponse};
use super::AppState;
use crate::emitter::EmitError;
use crate::llm::LlmError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Whole reply as one JSON object
        .route("/api/chat", post(send_chat))
        // Reply as SSE frames
        .route("/api/chat/stream", post(stream_chat))
        .route("/version", get(get_version))
        .with_state(state)
}

async fn send_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload?;
    let content = state.emitter.reply(&req.message).await?;
    Ok(Json(ChatResponse { content }))
}

async fn stream_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let frames = state.emitter.stream(&req.message).await?;
    tracing::debug!(mode = %state.emitter.frame_mode(), "Streaming reply");
    Ok(frame_response(state.emitter.frame_mode(), frames))
}

async fn get_version() -> &'static str {
    concat!("rivertown-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    InvalidInput(String),
    Upstream(LlmError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<EmitError> for AppError {
    fn from(error: EmitError) -> Self {
        match error {
            e @ EmitError::InvalidInput => AppError::InvalidInput(e.to_string()),
            EmitError::Upstream(e) => AppError::Upstream(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::InvalidInput(msg) => {
                tracing::warn!(reason = %msg, "Rejected chat request");
                msg
            }
            AppError::Upstream(e) => {
                tracing::error!(error = %e.message, kind = ?e.kind, "Provider call failed");
                STREAM_FAILURE_MESSAGE.to_string()
            }
        };

        let body = Json(ErrorResponse::new(message));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
