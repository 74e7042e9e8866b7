use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Conversation, Message, NewMessage};
use crate::error::RepoError;

/// Message store - the backing table of every conversation's history.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Fetch up to `limit` messages of a conversation, newest first.
    /// When `before` is set only messages strictly older than it are returned.
    async fn fetch_page(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, RepoError>;

    /// Messages of all given conversations, newest first. Callers take the
    /// first row per conversation as its latest message.
    async fn latest_for_conversations(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<Message>, RepoError>;

    /// Count messages not sent by `viewer_id` whose status is not `read`.
    async fn count_unread(&self, conversation_id: Uuid, viewer_id: Uuid)
    -> Result<u32, RepoError>;

    /// Set every message not sent by `viewer_id` to `read`.
    /// Returns the number of rows changed.
    async fn mark_read(&self, conversation_id: Uuid, viewer_id: Uuid) -> Result<u64, RepoError>;

    /// Persist a new message with status `sent`.
    async fn insert(&self, message: NewMessage) -> Result<Message, RepoError>;
}

/// Conversation store.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All conversations where `user_id` is requester or provider.
    async fn list_for_participant(&self, user_id: Uuid) -> Result<Vec<Conversation>, RepoError>;

    /// Delete a conversation. The store cascades the delete to its messages.
    async fn delete(&self, conversation_id: Uuid) -> Result<(), RepoError>;
}
