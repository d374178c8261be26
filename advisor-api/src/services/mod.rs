//! Domain services: external clients and the recommendation pipeline pieces

pub mod chroma;
pub mod context;
pub mod corpus;
pub mod gemini;
pub mod retriever;

pub use chroma::{ChromaIndex, SemanticIndex};
pub use gemini::{GeminiClient, ModelClient, ModelError, TextStream};
