//! Conversation thread cache.
//!
//! Client-side state for a viewer's conversations: incrementally loaded,
//! gap-free message windows per conversation, unread tracking, and read
//! state reconciliation against the message store.

mod cache;
mod scroll;
mod state;

pub use cache::{PrependCallback, ThreadCache, ThreadCacheConfig};
pub use scroll::ScrollAnchor;
pub use state::{DeleteReport, LoadOutcome, ReadOutcome, ThreadPage, ThreadPhase};
