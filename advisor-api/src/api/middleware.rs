//! Request guards applied ahead of every handler
//!
//! Request-size rejection and per-client rate limiting both run before
//! any business logic, so oversized or abusive traffic never touches
//! the store or the external clients.

use crate::api::error::ApiError;
use crate::AppState;
use advisor_common::config::{CHAT_RATE_PER_MINUTE, GENERAL_RATE_PER_MINUTE, MAX_REQUEST_SIZE};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::net::SocketAddr;
use std::num::NonZeroU32;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-client limiters: the chat endpoint drives a model call per
/// request and gets a tighter quota than the rest of the API.
pub struct RateLimits {
    chat: KeyedLimiter,
    general: KeyedLimiter,
}

impl RateLimits {
    pub fn new() -> Self {
        Self {
            chat: RateLimiter::keyed(per_minute(CHAT_RATE_PER_MINUTE)),
            general: RateLimiter::keyed(per_minute(GENERAL_RATE_PER_MINUTE)),
        }
    }

    fn check(&self, path: &str, key: String) -> bool {
        let limiter = if path.starts_with("/api/chat") {
            &self.chat
        } else {
            &self.general
        };
        limiter.check_key(&key).is_ok()
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}

fn per_minute(count: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(count).expect("rate quota must be non-zero"))
}

/// Reject write requests whose declared body size exceeds the cap,
/// before any handler runs.
pub async fn limit_request_size(request: Request, next: Next) -> Result<Response, ApiError> {
    if matches!(*request.method(), Method::POST | Method::PUT | Method::PATCH) {
        let declared = request
            .headers()
            .get(axum::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if let Some(length) = declared {
            if length > MAX_REQUEST_SIZE {
                return Err(ApiError::PayloadTooLarge(
                    "Request body exceeds the 1 MB limit".to_string(),
                ));
            }
        }
    }

    Ok(next.run(request).await)
}

/// Per-client rate limiting, keyed by peer address (or forwarded-for
/// header behind a proxy). The health endpoint is exempt.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let key = client_key(&request);
    if !state.rate_limits.check(request.uri().path(), key) {
        return Err(ApiError::RateLimited);
    }

    Ok(next.run(request).await)
}

fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
