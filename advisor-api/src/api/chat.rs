//! Chat and logout endpoints
//!
//! The chat handler is the advisor pipeline: sanitize, authorize,
//! retrieve candidates, assemble the prompt, then forward the model's
//! streamed answer. Fragments are forwarded to the caller as they
//! arrive through a bounded channel; the full answer is never buffered
//! first.

use crate::api::error::{new_error_id, ApiError};
use crate::api::{authorize, extract_code};
use crate::services::context::{build_history_context, build_profile_context, build_prompt};
use crate::services::retriever::retrieve;
use crate::services::{ModelClient, TextStream};
use crate::store::code_prefix;
use crate::AppState;
use advisor_common::config::{CHAT_MESSAGE_MAX_LENGTH, FALLBACK_SONGS_COUNT, INDEX_QUERY_LIMIT};
use advisor_common::sanitize::sanitize;
use advisor_common::types::ChatMessage;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

/// Bounded capacity of the fragment channel between the model stream
/// and the HTTP response body.
const STREAM_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/chat
///
/// Streamed `text/plain` response body; error paths before the stream
/// starts use the structured `{error, error_id}` shape.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = sanitize(&req.message, CHAT_MESSAGE_MAX_LENGTH);
    if message.is_empty() {
        return Err(ApiError::Validation("Message must not be empty".to_string()));
    }
    let code = extract_code(&headers, &req.code)?;
    let history = sanitize_history(&req.history)?;

    authorize(&state.store, &code).await?;

    let model = state.model.clone().ok_or_else(|| ApiError::Service {
        message: "The advisor is not available right now".to_string(),
        detail: "model client unconfigured (missing API key)".to_string(),
    })?;

    let profile = state.store.get_profile(&code).await?;
    let profile_context = build_profile_context(profile.as_ref());
    let history_context = build_history_context(&history);

    let candidates = retrieve(
        &message,
        state.index.as_deref(),
        &state.corpus,
        INDEX_QUERY_LIMIT,
        FALLBACK_SONGS_COUNT,
    )
    .await;
    let songs_context = serde_json::to_string(&candidates).map_err(ApiError::internal)?;

    let prompt = build_prompt(&message, &profile_context, &history_context, &songs_context);

    let stream = open_model_stream(model.as_ref(), &state.model_name, &prompt).await?;
    debug!("chat stream opened (code: {}...)", code_prefix(&code));
    Ok(stream_response(stream))
}

/// POST /api/logout
///
/// Deletes the user record outright: deletion is revocation. An
/// expired-but-present record may still be explicitly logged out, so
/// no expiry check happens here.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<LogoutRequest>>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let body_code = body.map(|Json(req)| req.code).unwrap_or_default();
    let code = extract_code(&headers, &body_code)?;

    if state.store.delete(&code).await? {
        info!("user logged out (code: {}...)", code_prefix(&code));
        Ok(Json(LogoutResponse {
            success: true,
            message: "Logged out".to_string(),
        }))
    } else {
        Err(ApiError::Authentication("Invalid access code".to_string()))
    }
}

/// Validate and sanitize prior messages before anything else runs.
fn sanitize_history(history: &[ChatMessage]) -> Result<Vec<ChatMessage>, ApiError> {
    let mut cleaned = Vec::with_capacity(history.len());
    for message in history {
        if !message.role_is_valid() {
            return Err(ApiError::Validation(format!(
                "History contains a disallowed role: {}",
                sanitize(&message.role, 20)
            )));
        }
        let content = sanitize(&message.content, CHAT_MESSAGE_MAX_LENGTH);
        if content.is_empty() {
            return Err(ApiError::Validation(
                "History contains an empty message".to_string(),
            ));
        }
        cleaned.push(ChatMessage {
            role: message.role.clone(),
            content,
        });
    }
    Ok(cleaned)
}

/// Establish the model stream; failures here can still be reported as
/// a structured error because nothing has been sent to the caller yet.
async fn open_model_stream(
    model: &dyn ModelClient,
    model_name: &str,
    prompt: &str,
) -> Result<TextStream, ApiError> {
    model
        .stream_generate(model_name, prompt)
        .await
        .map_err(|e| ApiError::Service {
            message: "The advisor is unavailable right now".to_string(),
            detail: format!("model stream establishment failed: {e}"),
        })
}

/// Forward a model stream through a bounded channel as the response
/// body.
///
/// Mid-stream failures cannot become a structured error body once the
/// response framing is committed, so the answer is truncated with a
/// marker carrying the correlation id and the detail is logged under
/// the same id. A closed channel means the caller disconnected; the
/// forwarding loop stops consuming instead of buffering on.
fn stream_response(mut stream: TextStream) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(STREAM_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => {
                    if tx.send(Ok(Bytes::from(text))).await.is_err() {
                        debug!("chat client disconnected mid-stream");
                        break;
                    }
                }
                Err(e) => {
                    let error_id = new_error_id();
                    error!("[{error_id}] model stream failed mid-answer: {e}");
                    let marker = format!("\n\n[回應中斷，錯誤代碼 {error_id}]");
                    let _ = tx.send(Ok(Bytes::from(marker))).await;
                    break;
                }
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
