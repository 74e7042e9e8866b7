//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod attachments;
mod clock;
mod embedding;
mod rate_limit;
mod repository;

pub use attachments::AttachmentStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use embedding::{Embedding, EmbeddingError, EmbeddingProvider};
pub use rate_limit::{
    RateLimitDecision, RateLimitError, RateLimitKey, RateLimitPolicy, RateLimiter,
    UNKNOWN_CLIENT,
};
pub use repository::{ConversationStore, MessageStore};
