use chrono::{DateTime, Utc};

use crate::domain::{Message, MessageStatus};

/// Lifecycle of a single thread.
///
/// `Idle -> InitialLoading -> Ready`, `Ready -> LoadingOlder -> Ready`,
/// and any state can fall into `Error`, which a new load moves back to `Ready`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ThreadPhase {
    #[default]
    Idle,
    InitialLoading,
    Ready,
    LoadingOlder,
    Error(String),
}

/// The loaded window of one conversation, in chronological order.
///
/// The window always ends at the newest known message; pages are prepended
/// or the whole window is replaced, never spliced in the middle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThreadPage {
    pub messages: Vec<Message>,
    /// Whether older messages may exist beyond the window.
    pub has_more: bool,
    /// A fetch for this thread is in flight.
    pub loading: bool,
    /// Cursor for the next older page: the earliest loaded timestamp.
    pub oldest: Option<DateTime<Utc>>,
    pub phase: ThreadPhase,
    pub(crate) generation: u64,
    /// Realtime arrivals received before the initial page landed.
    pub(crate) pending: Vec<Message>,
}

impl ThreadPage {
    pub fn is_loaded(&self) -> bool {
        matches!(self.phase, ThreadPhase::Ready | ThreadPhase::LoadingOlder)
    }

    pub fn newest(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Result of a page load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was applied; `count` messages were fetched.
    Loaded { count: usize },
    /// Nothing to do: no older messages, or a load is already in flight.
    Skipped,
    /// The response arrived after the thread was reloaded or removed and was discarded.
    Stale,
}

/// Result of a read reconciliation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Marked { updated: u64 },
    /// Nothing unread, or a mark for the same conversation is in flight.
    Skipped,
}

/// Summary of a conversation teardown. Attachment cleanup is best effort,
/// so its failures are collected here instead of failing the delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub attachments_removed: usize,
    pub warnings: Vec<String>,
}

/// State captured before an optimistic read update, restored if the store rejects it.
#[derive(Debug, Default)]
pub(crate) struct ReadSnapshot {
    pub unread_count: u32,
    pub statuses: Vec<(uuid::Uuid, MessageStatus)>,
    /// `CacheState::unread_epoch` when the snapshot was taken.
    pub unread_epoch: u64,
}
