//! Gemini API client
//!
//! Streams generated text from the Gemini REST API
//! (`streamGenerateContent` with SSE framing). Only the text parts of
//! each chunk are surfaced; everything else in the wire format is
//! ignored.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Model client errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Model API returned an error response
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Failed to parse a streamed chunk
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Lazy, finite, non-restartable sequence of generated text fragments.
pub type TextStream = BoxStream<'static, Result<String, ModelError>>;

/// Hosted language model interface.
///
/// Injected into the application state so tests can substitute fakes.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Open a streamed generation for `prompt` against `model`.
    ///
    /// The outer `Result` covers stream establishment; errors after the
    /// stream is up arrive as items.
    async fn stream_generate(&self, model: &str, prompt: &str) -> Result<TextStream, ModelError>;
}

/// Production [`ModelClient`] backed by the Gemini REST API.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn stream_generate(&self, model: &str, prompt: &str) -> Result<TextStream, ModelError> {
        let url = format!(
            "{BASE_URL}/{model}:streamGenerateContent?alt=sse&key={key}",
            key = self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(ModelError::Api(status, body));
        }

        let mut bytes = response.bytes_stream();

        // SSE frames arrive as `data: <json>` lines; chunks may split
        // lines arbitrarily, so buffer until a newline is seen.
        let stream = async_stream::stream! {
            let mut buf: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(ModelError::Network(e.to_string()));
                        return;
                    }
                };
                buf.extend_from_slice(&chunk);

                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let data = data.trim();
                    if data.is_empty() || data == "[DONE]" {
                        continue;
                    }

                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(parsed) => {
                            let text = parsed.text();
                            if !text.is_empty() {
                                yield Ok(text);
                            }
                        }
                        Err(e) => {
                            yield Err(ModelError::Parse(e.to_string()));
                            return;
                        }
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl StreamChunk {
    /// Concatenated text of all parts in the chunk.
    fn text(&self) -> String {
        let mut out = String::new();
        let candidates = self.candidates.iter().flatten();
        for candidate in candidates {
            let parts = candidate
                .content
                .iter()
                .flat_map(|c| c.parts.iter().flatten());
            for part in parts {
                if let Some(text) = &part.text {
                    out.push_str(text);
                }
            }
        }
        out
    }
}
