//! Runtime configuration and bounds
//!
//! Resolution follows the same priority order used across our modules:
//! command-line argument (applied by the caller), then environment
//! variable, then compiled default.

use std::path::PathBuf;

/// Days an access code stays valid after its record is created.
pub const TOKEN_EXPIRY_DAYS: u64 = 7;

/// Maximum saved conversations per user.
pub const MAX_SESSIONS_PER_USER: usize = 3;

/// Maximum length of a single chat message (characters, post-sanitize).
pub const CHAT_MESSAGE_MAX_LENGTH: usize = 500;

/// Maximum length of profile fields such as player name (characters).
pub const USER_NAME_MAX_LENGTH: usize = 50;

/// Maximum length of an access code (characters).
pub const ACCESS_CODE_MAX_LENGTH: usize = 100;

/// Maximum length of a saved session title (characters).
pub const SESSION_TITLE_MAX_LENGTH: usize = 100;

/// Top-K for semantic index queries.
pub const INDEX_QUERY_LIMIT: usize = 30;

/// Sample size when falling back to the full corpus.
pub const FALLBACK_SONGS_COUNT: usize = 15;

/// Maximum accepted request body size in bytes (1 MB).
pub const MAX_REQUEST_SIZE: u64 = 1024 * 1024;

/// Maximum lines kept by the sanitizer; excess lines are dropped.
pub const MAX_INPUT_LINES: usize = 50;

/// Per-client chat requests allowed per minute.
pub const CHAT_RATE_PER_MINUTE: u32 = 10;

/// Per-client requests per minute for all other endpoints.
pub const GENERAL_RATE_PER_MINUTE: u32 = 30;

/// Service configuration resolved at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Flat-file JSON user store
    pub users_db_path: PathBuf,
    /// Full song corpus snapshot (fallback retrieval source)
    pub songs_db_path: PathBuf,
    /// Chroma server base URL; `None` disables the semantic index
    pub chroma_url: Option<String>,
    /// Chroma collection holding the song embeddings
    pub chroma_collection: String,
    /// Gemini API key; `None` leaves the model client unconfigured
    pub gemini_api_key: Option<String>,
    /// Gemini model used for chat answers
    pub gemini_model: String,
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
}

impl Config {
    /// Resolve configuration from environment variables with compiled
    /// defaults. Empty variables are treated as unset.
    pub fn from_env() -> Self {
        Self {
            users_db_path: PathBuf::from(
                env_nonempty("USERS_DB_PATH").unwrap_or_else(|| "data/users.json".to_string()),
            ),
            songs_db_path: PathBuf::from(
                env_nonempty("SONGS_DB_PATH").unwrap_or_else(|| "data/songs.json".to_string()),
            ),
            chroma_url: env_nonempty("CHROMA_URL"),
            chroma_collection: env_nonempty("CHROMA_COLLECTION_NAME")
                .unwrap_or_else(|| "taiko_songs".to_string()),
            gemini_api_key: env_nonempty("GEMINI_API_KEY"),
            gemini_model: env_nonempty("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.5-flash-lite".to_string()),
            host: env_nonempty("ADVISOR_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: env_nonempty("ADVISOR_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
        }
    }

    /// Access-code expiry window in seconds.
    pub fn expiry_window_secs() -> f64 {
        (TOKEN_EXPIRY_DAYS * 86_400) as f64
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}
