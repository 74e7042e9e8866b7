//! In-memory stores - used as fallback when no database or storage service is configured.
//!
//! Note: Data is lost on process restart.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use counsel_core::domain::{Conversation, Message, MessageStatus, NewMessage};
use counsel_core::error::RepoError;
use counsel_core::ports::{AttachmentStore, Clock, ConversationStore, MessageStore, SystemClock};

/// Messages grouped by conversation, each list kept in chronological order.
pub struct InMemoryMessageStore {
    messages: RwLock<HashMap<Uuid, Vec<Message>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Add existing messages as-is.
    pub async fn seed(&self, messages: impl IntoIterator<Item = Message>) {
        let mut store = self.messages.write().await;
        for message in messages {
            let thread = store.entry(message.conversation_id).or_default();
            let at = thread.partition_point(|m| Message::chronological(m, &message).is_lt());
            thread.insert(at, message);
        }
    }

    /// Remove every message of a conversation.
    pub async fn purge(&self, conversation_id: Uuid) -> usize {
        self.messages
            .write()
            .await
            .remove(&conversation_id)
            .map_or(0, |thread| thread.len())
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn fetch_page(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, RepoError> {
        let store = self.messages.read().await;
        let Some(thread) = store.get(&conversation_id) else {
            return Ok(Vec::new());
        };

        Ok(thread
            .iter()
            .rev()
            .filter(|m| before.is_none_or(|cursor| m.created_at < cursor))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest_for_conversations(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<Message>, RepoError> {
        let store = self.messages.read().await;
        let mut messages: Vec<Message> = conversation_ids
            .iter()
            .filter_map(|id| store.get(id))
            .flat_map(|thread| thread.iter().cloned())
            .collect();
        messages.sort_by(|a, b| Message::chronological(b, a));
        Ok(messages)
    }

    async fn count_unread(
        &self,
        conversation_id: Uuid,
        viewer_id: Uuid,
    ) -> Result<u32, RepoError> {
        let store = self.messages.read().await;
        let count = store.get(&conversation_id).map_or(0, |thread| {
            thread
                .iter()
                .filter(|m| !m.is_from(viewer_id) && m.status != MessageStatus::Read)
                .count()
        });
        Ok(count as u32)
    }

    async fn mark_read(&self, conversation_id: Uuid, viewer_id: Uuid) -> Result<u64, RepoError> {
        let mut store = self.messages.write().await;
        let mut updated = 0;
        if let Some(thread) = store.get_mut(&conversation_id) {
            for message in thread.iter_mut().filter(|m| !m.is_from(viewer_id)) {
                if message.status.advance(MessageStatus::Read) {
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn insert(&self, message: NewMessage) -> Result<Message, RepoError> {
        let message = message.into_message(self.clock.now());
        self.seed([message.clone()]).await;
        Ok(message)
    }
}

/// Conversations, deleting through to the message store like a cascading foreign key.
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<Uuid, Conversation>>,
    messages: Arc<InMemoryMessageStore>,
}

impl InMemoryConversationStore {
    pub fn new(messages: Arc<InMemoryMessageStore>) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            messages,
        }
    }

    pub async fn insert(&self, conversation: Conversation) {
        self.conversations
            .write()
            .await
            .insert(conversation.id, conversation);
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn list_for_participant(&self, user_id: Uuid) -> Result<Vec<Conversation>, RepoError> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| c.involves(user_id))
            .cloned()
            .collect())
    }

    async fn delete(&self, conversation_id: Uuid) -> Result<(), RepoError> {
        if self
            .conversations
            .write()
            .await
            .remove(&conversation_id)
            .is_none()
        {
            return Err(RepoError::NotFound);
        }

        let removed = self.messages.purge(conversation_id).await;
        tracing::debug!(conversation_id = %conversation_id, removed, "Cascaded message delete");
        Ok(())
    }
}

/// Attachment paths kept in a sorted set, listed in lexical order like an object store.
#[derive(Default)]
pub struct InMemoryAttachmentStore {
    paths: RwLock<BTreeSet<String>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: impl Into<String>) {
        self.paths.write().await.insert(path.into());
    }

    pub async fn len(&self) -> usize {
        self.paths.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.paths.read().await.is_empty()
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn list(
        &self,
        prefix: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>, RepoError> {
        Ok(self
            .paths
            .read()
            .await
            .iter()
            .filter(|path| path.starts_with(prefix))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), RepoError> {
        let mut store = self.paths.write().await;
        for path in paths {
            store.remove(path);
        }
        Ok(())
    }
}
