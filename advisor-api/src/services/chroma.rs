//! Chroma semantic index client
//!
//! Queries a Chroma HTTP server for songs semantically close to a chat
//! message. Each hit carries the full song record as a serialized JSON
//! payload in its metadata (written by the offline index build), so no
//! second lookup is needed.
//!
//! The index is strictly best-effort: callers treat every failure as a
//! signal to fall back, never as a request error.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

/// Semantic index interface.
///
/// Returns serialized candidate records in similarity-ranked order. May
/// fail or return nothing; must not be assumed always available.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn query(&self, text: &str, top_k: usize) -> anyhow::Result<Vec<String>>;
}

/// Production [`SemanticIndex`] backed by a Chroma server.
pub struct ChromaIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    collection_id: OnceCell<String>,
}

impl ChromaIndex {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            collection: collection.into(),
            collection_id: OnceCell::new(),
        }
    }

    /// Resolve the collection name to its id, once per process.
    async fn collection_id(&self) -> anyhow::Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!(
                    "{}/api/v1/collections/{}",
                    self.base_url.trim_end_matches('/'),
                    self.collection
                );
                let info: CollectionInfo = self
                    .client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok::<_, anyhow::Error>(info.id)
            })
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl SemanticIndex for ChromaIndex {
    async fn query(&self, text: &str, top_k: usize) -> anyhow::Result<Vec<String>> {
        let collection_id = self.collection_id().await?;
        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.base_url.trim_end_matches('/'),
            collection_id
        );

        let body = json!({
            "query_texts": [text],
            "n_results": top_k,
            "include": ["metadatas"],
        });

        let response: QueryResponse = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hits = response
            .metadatas
            .into_iter()
            .flatten()
            .next()
            .unwrap_or_default();

        // Hits stay in the similarity-ranked order Chroma returned.
        Ok(hits
            .into_iter()
            .filter_map(|meta| meta.json)
            .collect())
    }
}

#[derive(Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    /// One inner list per query text; we always send exactly one.
    metadatas: Option<Vec<Vec<HitMetadata>>>,
}

#[derive(Deserialize)]
struct HitMetadata {
    /// Serialized song record embedded at index-build time.
    json: Option<String>,
}
