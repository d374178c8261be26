//! Saved conversation endpoints
//!
//! Sessions are immutable once saved; the only mutations are append
//! (bounded per user) and delete. Message content is re-sanitized on
//! the way in so the bound holds on every write path.

use crate::api::error::ApiError;
use crate::api::{authorize, extract_code, require_bearer};
use crate::store::code_prefix;
use crate::AppState;
use advisor_common::config::{CHAT_MESSAGE_MAX_LENGTH, SESSION_TITLE_MAX_LENGTH};
use advisor_common::sanitize::sanitize;
use advisor_common::types::{ChatMessage, ChatSession};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SaveSessionRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<ChatSession>,
}

#[derive(Debug, Serialize)]
pub struct SaveSessionResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteSessionResponse {
    pub success: bool,
}

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    let code = require_bearer(&headers)?;
    authorize(&state.store, &code).await?;

    let sessions = state.store.list_sessions(&code).await?;
    Ok(Json(ListSessionsResponse { sessions }))
}

/// POST /api/sessions
pub async fn save_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SaveSessionRequest>,
) -> Result<Json<SaveSessionResponse>, ApiError> {
    let code = extract_code(&headers, &req.code)?;
    authorize(&state.store, &code).await?;

    let title = sanitize(&req.title, SESSION_TITLE_MAX_LENGTH);
    if title.is_empty() {
        return Err(ApiError::Validation(
            "Session title must not be empty".to_string(),
        ));
    }
    if req.messages.is_empty() {
        return Err(ApiError::Validation(
            "Session must contain at least one message".to_string(),
        ));
    }

    let mut messages = Vec::with_capacity(req.messages.len());
    for message in &req.messages {
        if !message.role_is_valid() {
            return Err(ApiError::Validation(format!(
                "Invalid message role: {}",
                sanitize(&message.role, 20)
            )));
        }
        messages.push(ChatMessage {
            role: message.role.clone(),
            content: sanitize(&message.content, CHAT_MESSAGE_MAX_LENGTH),
        });
    }

    let capacity = state.store.session_capacity();
    let session = ChatSession {
        id: Uuid::new_v4().to_string(),
        title,
        messages,
    };
    let session_id = session.id.clone();

    if state.store.add_session(&code, session).await? {
        info!(
            "session saved (code: {}..., session_id: {session_id})",
            code_prefix(&code)
        );
        Ok(Json(SaveSessionResponse { success: true, session_id }))
    } else {
        Err(ApiError::Validation(format!(
            "Session limit reached ({capacity}), delete an old conversation first"
        )))
    }
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteSessionResponse>, ApiError> {
    let code = require_bearer(&headers)?;
    authorize(&state.store, &code).await?;

    if state.store.delete_session(&code, &session_id).await? {
        info!(
            "session deleted (code: {}..., session_id: {session_id})",
            code_prefix(&code)
        );
        Ok(Json(DeleteSessionResponse { success: true }))
    } else {
        Err(ApiError::NotFound("Session not found".to_string()))
    }
}
