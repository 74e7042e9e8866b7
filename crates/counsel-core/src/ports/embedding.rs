//! Embedding provider port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A vector embedding and the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
}

/// Turns text into vector embeddings through an external API.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, input: &str) -> Result<Embedding, EmbeddingError>;
}

/// Embedding errors.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding provider misconfigured: {0}")]
    Config(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}
