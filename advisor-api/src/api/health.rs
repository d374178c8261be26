//! Health check endpoint

use crate::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub checks: HealthChecks,
    pub songs_count: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub model: bool,
    pub index: bool,
    pub songs_loaded: bool,
    pub user_db_writable: bool,
}

/// GET /health
///
/// No authentication and no rate limiting; reports whether each
/// dependency the pipeline relies on is in place.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let checks = HealthChecks {
        model: state.model.is_some(),
        index: state.index.is_some(),
        songs_loaded: !state.corpus.is_empty(),
        user_db_writable: state.store.is_writable(),
    };

    let all_healthy =
        checks.model && checks.index && checks.songs_loaded && checks.user_db_writable;

    Json(HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        module: "advisor-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
        songs_count: state.corpus.len(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
