//! # Counsel Infrastructure
//!
//! Concrete implementations of the ports defined in `counsel-core`.
//! This crate contains the rate limiters, message/conversation stores,
//! attachment storage, and the embedding API client.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL message and conversation stores via SeaORM
//! - `redis` - Redis-backed, cross-instance rate limiting (opt-in at runtime)
//! - `http` - Storage API attachment store and embedding client via reqwest

pub mod rate_limit;
pub mod store;

#[cfg(feature = "postgres")]
pub mod database;

#[cfg(feature = "http")]
pub mod embedding;
#[cfg(feature = "http")]
pub mod storage;

// Re-exports - In-Memory
pub use rate_limit::InMemoryRateLimiter;
pub use store::{InMemoryAttachmentStore, InMemoryConversationStore, InMemoryMessageStore};

#[cfg(feature = "postgres")]
pub use database::{PostgresConversationStore, PostgresMessageStore};

#[cfg(feature = "redis")]
pub use rate_limit::{RedisRateLimitConfig, RedisRateLimiter};

#[cfg(feature = "http")]
pub use embedding::{EmbeddingConfig, OpenAiEmbeddingClient};
#[cfg(feature = "http")]
pub use storage::{HttpAttachmentStore, StorageConfig};
