//! HTTP API handlers and shared request plumbing

pub mod chat;
pub mod error;
pub mod health;
pub mod login;
pub mod middleware;
pub mod profile;
pub mod sessions;

use crate::store::UserStore;
use advisor_common::config::ACCESS_CODE_MAX_LENGTH;
use advisor_common::sanitize::sanitize;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use error::ApiError;

/// Access code from a `Bearer` Authorization header, sanitized.
/// `None` when the header is absent, malformed, or sanitizes to empty.
pub fn bearer_code(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("bearer") {
        return None;
    }
    let code = sanitize(parts[1], ACCESS_CODE_MAX_LENGTH);
    (!code.is_empty()).then_some(code)
}

/// Ordered credential extraction: the Authorization header wins, the
/// legacy body `code` field is the fallback.
pub fn extract_code(headers: &HeaderMap, body_code: &str) -> Result<String, ApiError> {
    if let Some(code) = bearer_code(headers) {
        return Ok(code);
    }

    let code = sanitize(body_code, ACCESS_CODE_MAX_LENGTH);
    if code.is_empty() {
        return Err(ApiError::Validation("Missing access code".to_string()));
    }
    Ok(code)
}

/// Bearer-only extraction for endpoints without a request body.
pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Validation("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Validation("Invalid Authorization header format".to_string()))?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("bearer") {
        return Err(ApiError::Validation(
            "Invalid Authorization header format".to_string(),
        ));
    }

    Ok(sanitize(parts[1], ACCESS_CODE_MAX_LENGTH))
}

/// Gate an operation on a live token.
pub async fn authorize(store: &UserStore, code: &str) -> Result<(), ApiError> {
    if store.validate(code).await? {
        Ok(())
    } else {
        Err(ApiError::Authentication(
            "Invalid or expired access code".to_string(),
        ))
    }
}
