//! Embedding providers.

mod openai;

pub use openai::{EmbeddingConfig, OpenAiEmbeddingClient};
