//! advisor-api library - Taiko Advisor backend service
//!
//! Authenticates players by opaque access codes, stores profiles and
//! saved conversations in a flat-file JSON store, and answers song
//! recommendation queries by retrieving candidates from a semantic
//! index and forwarding them with player context to a hosted model for
//! a streamed answer.

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod services;
pub mod store;

use advisor_common::types::Song;
use api::middleware::RateLimits;
use services::{ModelClient, SemanticIndex};
use store::UserStore;

/// Application state shared across HTTP handlers
///
/// All external resource handles live here and are injected at
/// construction, so tests can substitute fakes for the model client
/// and the semantic index.
#[derive(Clone)]
pub struct AppState {
    /// Flat-file user store (token lifecycle, profiles, sessions)
    pub store: UserStore,
    /// Hosted model client; `None` when no API key is configured
    pub model: Option<Arc<dyn ModelClient>>,
    /// Model identifier passed to the client per request
    pub model_name: String,
    /// Semantic song index; `None` degrades retrieval to fallback
    pub index: Option<Arc<dyn SemanticIndex>>,
    /// Full corpus snapshot, loaded once at startup
    pub corpus: Arc<Vec<Song>>,
    /// Per-client request quotas
    pub rate_limits: Arc<RateLimits>,
}

impl AppState {
    pub fn new(
        store: UserStore,
        model: Option<Arc<dyn ModelClient>>,
        model_name: impl Into<String>,
        index: Option<Arc<dyn SemanticIndex>>,
        corpus: Vec<Song>,
    ) -> Self {
        Self {
            store,
            model,
            model_name: model_name.into(),
            index,
            corpus: Arc::new(corpus),
            rate_limits: Arc::new(RateLimits::new()),
        }
    }
}

/// Build application router
///
/// The size guard runs outermost so oversized payloads are rejected
/// before anything else; rate limiting covers every /api route.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/login", post(api::login::login))
        .route(
            "/api/profile",
            get(api::profile::get_profile).post(api::profile::save_profile),
        )
        .route(
            "/api/sessions",
            get(api::sessions::list_sessions).post(api::sessions::save_session),
        )
        .route("/api/sessions/:id", delete(api::sessions::delete_session))
        .route("/api/chat", post(api::chat::chat))
        .route("/api/logout", post(api::chat::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::middleware::rate_limit,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT]);

    Router::new()
        .merge(api_routes)
        .merge(api::health::health_routes())
        .layer(middleware::from_fn(api::middleware::limit_request_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
