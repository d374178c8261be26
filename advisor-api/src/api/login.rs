//! Login endpoint
//!
//! Access codes are provisioned out-of-band (whitelist model); login
//! only checks that the presented code maps to a live record. Expired
//! and corrupt records are deleted by the check itself.

use crate::api::error::ApiError;
use crate::store::TokenStatus;
use crate::AppState;
use advisor_common::config::{ACCESS_CODE_MAX_LENGTH, TOKEN_EXPIRY_DAYS};
use advisor_common::sanitize::sanitize;
use advisor_common::types::Profile;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    /// True when the caller should be routed to profile setup first.
    pub needs_profile: bool,
    pub profile: Option<Profile>,
    /// Remaining lifetime hint in seconds (full window; the exact
    /// remainder is not exposed).
    pub expires_in: u64,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let code = sanitize(&req.code, ACCESS_CODE_MAX_LENGTH);
    if code.is_empty() {
        return Err(ApiError::Validation(
            "Access code must not be empty".to_string(),
        ));
    }

    match state.store.check_token(&code).await? {
        TokenStatus::Unknown => Err(ApiError::Authentication(
            "Invalid access code".to_string(),
        )),
        TokenStatus::Expired => Err(ApiError::Authentication(
            "Access code expired, please request a new one".to_string(),
        )),
        TokenStatus::Active { profile } => Ok(Json(LoginResponse {
            success: true,
            needs_profile: profile.is_none(),
            profile,
            expires_in: TOKEN_EXPIRY_DAYS * 24 * 3600,
        })),
    }
}
