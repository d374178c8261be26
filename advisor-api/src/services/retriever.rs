//! Candidate song retrieval
//!
//! Asks the semantic index for songs close to the player's message and
//! deserializes each hit's embedded record. Any index failure (or an
//! empty result) degrades to a bounded random sample of the full corpus
//! so the pipeline is never blocked solely by index unavailability —
//! at the cost of recommendation relevance.
//!
//! Index results keep the index's similarity ranking; fallback results
//! are in random order. Either way the downstream prompt treats the
//! list as unordered: the model performs final ranking and selection.

use crate::services::SemanticIndex;
use advisor_common::types::Song;
use rand::seq::SliceRandom;
use tracing::{error, warn};

/// Retrieve candidate songs for a chat message.
///
/// `top_k` bounds the index query; `fallback_count` bounds the random
/// sample drawn from `corpus` when the index yields nothing.
pub async fn retrieve(
    message: &str,
    index: Option<&dyn SemanticIndex>,
    corpus: &[Song],
    top_k: usize,
    fallback_count: usize,
) -> Vec<Song> {
    let mut candidates = Vec::new();

    if let Some(index) = index {
        match index.query(message, top_k).await {
            Ok(payloads) => {
                for payload in payloads {
                    match serde_json::from_str::<Song>(&payload) {
                        Ok(song) => candidates.push(song),
                        Err(e) => warn!("skipping undecodable index payload: {e}"),
                    }
                }
            }
            Err(e) => error!("semantic index query failed: {e}"),
        }
    }

    if candidates.is_empty() && !corpus.is_empty() {
        let count = fallback_count.min(corpus.len());
        candidates = corpus
            .choose_multiple(&mut rand::thread_rng(), count)
            .cloned()
            .collect();
        warn!("semantic index unavailable or empty, sampled {count} songs from corpus");
    }

    candidates
}
