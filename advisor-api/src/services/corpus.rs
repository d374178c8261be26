//! Corpus snapshot loading
//!
//! The full song list is read once at startup and kept in memory as the
//! fallback retrieval source. A missing or unreadable corpus is not
//! fatal: the service starts with an empty snapshot and the retriever
//! simply has nothing to fall back on.

use advisor_common::types::Song;
use advisor_common::Result;
use std::path::Path;
use tracing::{info, warn};

/// Load the corpus snapshot from `songs.json`.
pub fn load_corpus(path: &Path) -> Result<Vec<Song>> {
    let content = std::fs::read_to_string(path)?;
    let songs: Vec<Song> = serde_json::from_str(&content)?;
    Ok(songs)
}

/// Load the corpus, degrading to an empty snapshot on failure.
pub fn load_corpus_or_empty(path: &Path) -> Vec<Song> {
    match load_corpus(path) {
        Ok(songs) => {
            info!("loaded {} songs from {}", songs.len(), path.display());
            songs
        }
        Err(e) => {
            warn!("could not load corpus from {}: {e}", path.display());
            Vec::new()
        }
    }
}
