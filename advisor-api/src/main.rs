//! advisor-api - Taiko Advisor backend entry point
//!
//! Wires configuration, the user store, the corpus snapshot, and the
//! external clients into the HTTP server. Also provides the
//! provisioning CLI used to mint new access codes.

use advisor_api::services::corpus::load_corpus_or_empty;
use advisor_api::services::{ChromaIndex, GeminiClient, ModelClient, SemanticIndex};
use advisor_api::store::UserStore;
use advisor_api::{build_router, AppState};
use advisor_common::config::{Config, ACCESS_CODE_MAX_LENGTH};
use advisor_common::sanitize::sanitize;
use anyhow::{bail, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "advisor-api", about = "Taiko Advisor backend service")]
struct Args {
    /// Path to the user store JSON file (overrides USERS_DB_PATH)
    #[arg(long)]
    users_db: Option<PathBuf>,

    /// Path to the song corpus JSON file (overrides SONGS_DB_PATH)
    #[arg(long)]
    songs_db: Option<PathBuf>,

    /// HTTP bind port (overrides ADVISOR_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Provision a new access code and exit
    #[arg(long, value_name = "CODE")]
    provision: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Taiko Advisor (advisor-api) v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(path) = args.users_db {
        config.users_db_path = path;
    }
    if let Some(path) = args.songs_db {
        config.songs_db_path = path;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let store = UserStore::new(&config.users_db_path);

    if let Some(code) = args.provision {
        return provision(&store, &code).await;
    }

    let corpus = load_corpus_or_empty(&config.songs_db_path);

    let model: Option<Arc<dyn ModelClient>> = match &config.gemini_api_key {
        Some(key) => {
            info!("model client configured ({})", config.gemini_model);
            Some(Arc::new(GeminiClient::new(key.clone())))
        }
        None => {
            warn!("GEMINI_API_KEY not set; chat requests will be rejected");
            None
        }
    };

    let index: Option<Arc<dyn SemanticIndex>> = match &config.chroma_url {
        Some(url) => {
            info!("semantic index at {} (collection: {})", url, config.chroma_collection);
            Some(Arc::new(ChromaIndex::new(url.clone(), config.chroma_collection.clone())))
        }
        None => {
            warn!("CHROMA_URL not set; retrieval will use corpus fallback only");
            None
        }
    };

    let state = AppState::new(store, model, config.gemini_model.clone(), index, corpus);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("advisor-api listening on http://{addr}");
    info!("Health check: http://{addr}/health");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Mint a new access code (whitelist provisioning is out-of-band; this
/// is the operator's entry point).
async fn provision(store: &UserStore, code: &str) -> Result<()> {
    let code = sanitize(code, ACCESS_CODE_MAX_LENGTH);
    if code.is_empty() {
        bail!("access code must not be empty after sanitization");
    }

    if store.create(&code).await? {
        info!("access code provisioned (store: {})", store.path().display());
        Ok(())
    } else {
        bail!("access code already exists")
    }
}
