//! Caller-facing error taxonomy
//!
//! Every non-streaming failure is serialized as `{error, error_id}`
//! where `error_id` is a short correlation token. Internal detail is
//! logged server-side keyed by that id and never reaches the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

/// 8-character uppercase hex correlation token, unique per failure.
pub fn new_error_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// API error taxonomy with a fixed status mapping.
#[derive(Debug)]
pub enum ApiError {
    /// Caller input malformed or missing (400)
    Validation(String),
    /// Unknown, expired, corrupt, or absent token (401)
    Authentication(String),
    /// No matching session or entity (404)
    NotFound(String),
    /// Request body over the configured cap (413)
    PayloadTooLarge(String),
    /// Too many requests from one client (429)
    RateLimited,
    /// Dependency misconfigured or down, or an unexpected internal
    /// failure (500). `message` is shown to the caller; `detail` is
    /// only logged.
    Service { message: String, detail: String },
}

impl ApiError {
    /// Generic 500 wrapping an internal error whose text must not leak.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::Service {
            message: "Internal server error, please try again later".to_string(),
            detail: detail.to_string(),
        }
    }
}

impl From<advisor_common::Error> for ApiError {
    fn from(e: advisor_common::Error) -> Self {
        ApiError::internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = new_error_id();

        let (status, message) = match self {
            ApiError::Validation(message) => {
                warn!("[{error_id}] validation error: {message}");
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::Authentication(message) => {
                warn!("[{error_id}] authentication error: {message}");
                (StatusCode::UNAUTHORIZED, message)
            }
            ApiError::NotFound(message) => {
                warn!("[{error_id}] not found: {message}");
                (StatusCode::NOT_FOUND, message)
            }
            ApiError::PayloadTooLarge(message) => {
                warn!("[{error_id}] payload too large: {message}");
                (StatusCode::PAYLOAD_TOO_LARGE, message)
            }
            ApiError::RateLimited => {
                warn!("[{error_id}] rate limit exceeded");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests, please try again later".to_string(),
                )
            }
            ApiError::Service { message, detail } => {
                error!("[{error_id}] service error: {detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = Json(json!({
            "error": message,
            "error_id": error_id,
        }));

        (status, body).into_response()
    }
}
