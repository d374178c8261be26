//! Profile endpoints
//!
//! GET authenticates via the Authorization header only; POST also
//! accepts the legacy body `code` field for older clients.

use crate::api::error::ApiError;
use crate::api::{authorize, extract_code, require_bearer};
use crate::store::code_prefix;
use crate::AppState;
use advisor_common::config::USER_NAME_MAX_LENGTH;
use advisor_common::sanitize::{require_field, sanitize};
use advisor_common::types::Profile;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub star_pref: String,
    #[serde(default)]
    pub style: String,
}

#[derive(Debug, Serialize)]
pub struct SaveProfileResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GetProfileResponse {
    pub profile: Option<Profile>,
}

/// POST /api/profile
///
/// Name and level are required; star preference and play style may be
/// empty. The stored profile is replaced wholesale.
pub async fn save_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<SaveProfileResponse>, ApiError> {
    let code = extract_code(&headers, &req.code)?;
    authorize(&state.store, &code).await?;

    let name = require_field(&req.name, "Player name", USER_NAME_MAX_LENGTH)
        .map_err(ApiError::Validation)?;
    let level = require_field(&req.level, "Dan level", USER_NAME_MAX_LENGTH)
        .map_err(ApiError::Validation)?;
    let star_pref = sanitize(&req.star_pref, USER_NAME_MAX_LENGTH);
    let style = sanitize(&req.style, USER_NAME_MAX_LENGTH);

    let profile = Profile { name, level, star_pref, style };

    if state.store.update_profile(&code, profile).await? {
        info!("profile updated (code: {}...)", code_prefix(&code));
        Ok(Json(SaveProfileResponse {
            success: true,
            message: "Profile saved".to_string(),
        }))
    } else {
        // Record vanished between validation and update (e.g. a
        // concurrent logout).
        Err(ApiError::Authentication("Invalid access code".to_string()))
    }
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GetProfileResponse>, ApiError> {
    let code = require_bearer(&headers)?;
    authorize(&state.store, &code).await?;

    let profile = state.store.get_profile(&code).await?;
    Ok(Json(GetProfileResponse { profile }))
}
