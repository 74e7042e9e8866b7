use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{Attachment, Conversation, Message, MessageStatus, NewMessage};
use crate::error::ThreadError;
use crate::ports::{AttachmentStore, ConversationStore, MessageStore};

use super::state::{DeleteReport, LoadOutcome, ReadOutcome, ReadSnapshot, ThreadPage, ThreadPhase};

/// Called with the conversation id and the number of messages prepended
/// after an older page lands, so a view can restore its scroll anchor.
pub type PrependCallback = Box<dyn Fn(Uuid, usize) + Send + Sync>;

/// Thread cache configuration.
#[derive(Debug, Clone)]
pub struct ThreadCacheConfig {
    /// Messages fetched per page.
    pub page_size: usize,
    /// Attachment objects listed and deleted per storage request.
    pub attachment_batch_size: usize,
}

impl Default for ThreadCacheConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            attachment_batch_size: 100,
        }
    }
}

#[derive(Default)]
struct CacheState {
    conversations: HashMap<Uuid, Conversation>,
    threads: HashMap<Uuid, ThreadPage>,
    active: Option<Uuid>,
    marking_read: HashSet<Uuid>,
    generation: u64,
    /// Bumped whenever unread counts are reloaded from the store.
    unread_epoch: u64,
}

impl CacheState {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// The thread for `conversation_id`, only if it still belongs to the request tagged `generation`.
    fn current_thread(&mut self, conversation_id: Uuid, generation: u64) -> Option<&mut ThreadPage> {
        self.threads
            .get_mut(&conversation_id)
            .filter(|thread| thread.generation == generation)
    }

    fn apply_latest(&mut self, message: &Message) {
        if let Some(conversation) = self.conversations.get_mut(&message.conversation_id) {
            let newer = conversation
                .last_message_at
                .is_none_or(|at| message.created_at >= at);
            if newer {
                conversation.last_message_at = Some(message.created_at);
                conversation.last_message_preview = Some(message.preview());
            }
        }
    }
}

/// Per-viewer cache of conversations and their message windows.
///
/// All state sits behind one mutex that is never held across a store call,
/// so the in-flight guards (`loading`, pending read marks) are checked and
/// set atomically even when several futures drive the same cache.
pub struct ThreadCache {
    viewer_id: Uuid,
    config: ThreadCacheConfig,
    messages: Arc<dyn MessageStore>,
    conversations: Arc<dyn ConversationStore>,
    attachments: Arc<dyn AttachmentStore>,
    state: Mutex<CacheState>,
    on_prepended: Option<PrependCallback>,
}

impl ThreadCache {
    pub fn new(
        viewer_id: Uuid,
        messages: Arc<dyn MessageStore>,
        conversations: Arc<dyn ConversationStore>,
        attachments: Arc<dyn AttachmentStore>,
    ) -> Self {
        Self {
            viewer_id,
            config: ThreadCacheConfig::default(),
            messages,
            conversations,
            attachments,
            state: Mutex::new(CacheState::default()),
            on_prepended: None,
        }
    }

    pub fn with_config(mut self, config: ThreadCacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the content-prepended callback.
    pub fn on_content_prepended<F>(mut self, callback: F) -> Self
    where
        F: Fn(Uuid, usize) + Send + Sync + 'static,
    {
        self.on_prepended = Some(Box::new(callback));
        self
    }

    pub fn viewer_id(&self) -> Uuid {
        self.viewer_id
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Conversations ordered by latest activity, newest first.
    pub fn conversations(&self) -> Vec<Conversation> {
        let mut conversations: Vec<Conversation> =
            self.state().conversations.values().cloned().collect();
        conversations.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));
        conversations
    }

    pub fn conversation(&self, conversation_id: Uuid) -> Option<Conversation> {
        self.state().conversations.get(&conversation_id).cloned()
    }

    pub fn thread(&self, conversation_id: Uuid) -> Option<ThreadPage> {
        self.state().threads.get(&conversation_id).cloned()
    }

    pub fn active_conversation(&self) -> Option<Uuid> {
        self.state().active
    }

    /// Reload the viewer's conversation list with latest-message previews and unread counts.
    ///
    /// Messages come back newest first across all conversations; the first
    /// one seen for a conversation is its latest. Loaded threads of
    /// conversations that still exist are kept.
    pub async fn refresh_conversations(&self) -> Result<Vec<Conversation>, ThreadError> {
        let mut listed = self
            .conversations
            .list_for_participant(self.viewer_id)
            .await
            .map_err(ThreadError::Conversations)?;

        let ids: Vec<Uuid> = listed.iter().map(|c| c.id).collect();
        let latest = if ids.is_empty() {
            Vec::new()
        } else {
            self.messages
                .latest_for_conversations(&ids)
                .await
                .map_err(ThreadError::Conversations)?
        };

        let mut latest_by_conversation: HashMap<Uuid, Message> = HashMap::new();
        for message in latest {
            latest_by_conversation
                .entry(message.conversation_id)
                .or_insert(message);
        }

        for conversation in &mut listed {
            if let Some(message) = latest_by_conversation.get(&conversation.id) {
                conversation.last_message_at = Some(message.created_at);
                conversation.last_message_preview = Some(message.preview());
            }
            conversation.unread_count = self
                .messages
                .count_unread(conversation.id, self.viewer_id)
                .await
                .map_err(ThreadError::Conversations)?;
        }
        listed.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));

        let mut state = self.state();
        state.conversations = listed.iter().map(|c| (c.id, c.clone())).collect();
        state.unread_epoch += 1;
        let CacheState {
            conversations,
            threads,
            active,
            ..
        } = &mut *state;
        threads.retain(|id, _| conversations.contains_key(id));
        if active.is_some_and(|id| !conversations.contains_key(&id)) {
            *active = None;
        }

        debug!(
            viewer_id = %self.viewer_id,
            count = listed.len(),
            "Conversations refreshed"
        );
        Ok(listed)
    }

    /// Make `conversation_id` the active conversation, loading its first page if needed.
    pub async fn select_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<LoadOutcome, ThreadError> {
        let needs_load = {
            let mut state = self.state();
            state.active = Some(conversation_id);
            state
                .threads
                .get(&conversation_id)
                .is_none_or(|thread| matches!(thread.phase, ThreadPhase::Idle | ThreadPhase::Error(_)))
        };

        if needs_load {
            self.load_initial_page(conversation_id).await
        } else {
            Ok(LoadOutcome::Skipped)
        }
    }

    /// Replace the thread window with the newest page of messages.
    pub async fn load_initial_page(
        &self,
        conversation_id: Uuid,
    ) -> Result<LoadOutcome, ThreadError> {
        let generation = {
            let mut state = self.state();
            let generation = state.next_generation();
            let thread = state.threads.entry(conversation_id).or_default();
            thread.generation = generation;
            thread.loading = true;
            thread.phase = ThreadPhase::InitialLoading;
            generation
        };

        let result = self
            .messages
            .fetch_page(conversation_id, None, self.config.page_size)
            .await;

        let mut state = self.state();
        let Some(thread) = state.current_thread(conversation_id, generation) else {
            debug!(conversation_id = %conversation_id, "Discarding stale initial page");
            return Ok(LoadOutcome::Stale);
        };
        thread.loading = false;

        let mut page = match result {
            Ok(page) => page,
            Err(source) => {
                warn!(conversation_id = %conversation_id, error = %source, "Initial page load failed");
                thread.pending.clear();
                thread.phase = ThreadPhase::Error(source.to_string());
                return Err(ThreadError::Load {
                    conversation_id,
                    source,
                });
            }
        };

        let count = page.len();
        thread.has_more = count == self.config.page_size;
        for arrived in std::mem::take(&mut thread.pending) {
            match page.iter_mut().find(|m| m.id == arrived.id) {
                Some(fetched) => {
                    fetched.status.advance(arrived.status);
                }
                None => page.push(arrived),
            }
        }
        page.sort_by(Message::chronological);
        thread.oldest = page.first().map(|m| m.created_at);
        thread.messages = page;
        thread.phase = ThreadPhase::Ready;

        if let Some(newest) = thread.newest().cloned() {
            state.apply_latest(&newest);
        }

        debug!(conversation_id = %conversation_id, count, "Initial page loaded");
        Ok(LoadOutcome::Loaded { count })
    }

    /// Prepend the next page of messages older than the current cursor.
    pub async fn load_older_page(
        &self,
        conversation_id: Uuid,
    ) -> Result<LoadOutcome, ThreadError> {
        let (cursor, generation) = {
            let mut state = self.state();
            let thread = state
                .threads
                .get_mut(&conversation_id)
                .ok_or(ThreadError::UnknownConversation(conversation_id))?;
            if thread.loading || !thread.has_more {
                return Ok(LoadOutcome::Skipped);
            }
            let Some(cursor) = thread.oldest else {
                return Ok(LoadOutcome::Skipped);
            };
            thread.loading = true;
            thread.phase = ThreadPhase::LoadingOlder;
            (cursor, thread.generation)
        };

        let result = self
            .messages
            .fetch_page(conversation_id, Some(cursor), self.config.page_size)
            .await;

        let count = {
            let mut state = self.state();
            let Some(thread) = state.current_thread(conversation_id, generation) else {
                debug!(conversation_id = %conversation_id, "Discarding stale older page");
                return Ok(LoadOutcome::Stale);
            };
            thread.loading = false;

            let mut older = match result {
                Ok(page) => page,
                Err(source) => {
                    warn!(conversation_id = %conversation_id, error = %source, "Older page load failed");
                    thread.phase = ThreadPhase::Error(source.to_string());
                    return Err(ThreadError::Load {
                        conversation_id,
                        source,
                    });
                }
            };

            thread.has_more = older.len() == self.config.page_size;
            older.retain(|m| m.created_at < cursor);
            older.sort_by(Message::chronological);
            if let Some(first) = older.first() {
                thread.oldest = Some(first.created_at);
            }

            let count = older.len();
            older.append(&mut thread.messages);
            thread.messages = older;
            thread.phase = ThreadPhase::Ready;
            count
        };

        if count > 0 {
            if let Some(callback) = &self.on_prepended {
                callback(conversation_id, count);
            }
        }

        debug!(conversation_id = %conversation_id, count, "Older page prepended");
        Ok(LoadOutcome::Loaded { count })
    }

    /// Mark everything the other participant sent as read.
    ///
    /// The local state is updated before the store call. If the store
    /// rejects the update, the previous unread count and message statuses
    /// are restored and the error is returned.
    pub async fn mark_conversation_read(
        &self,
        conversation_id: Uuid,
    ) -> Result<ReadOutcome, ThreadError> {
        let viewer_id = self.viewer_id;

        let snapshot = {
            let mut state = self.state();
            let unread = state
                .conversations
                .get(&conversation_id)
                .map_or(0, |c| c.unread_count);
            if unread == 0 || !state.marking_read.insert(conversation_id) {
                return Ok(ReadOutcome::Skipped);
            }

            let mut snapshot = ReadSnapshot {
                unread_count: unread,
                statuses: Vec::new(),
                unread_epoch: state.unread_epoch,
            };
            if let Some(thread) = state.threads.get_mut(&conversation_id) {
                for message in thread.messages.iter_mut().filter(|m| !m.is_from(viewer_id)) {
                    let previous = message.status;
                    if message.status.advance(MessageStatus::Read) {
                        snapshot.statuses.push((message.id, previous));
                    }
                }
            }
            if let Some(conversation) = state.conversations.get_mut(&conversation_id) {
                conversation.unread_count = 0;
            }
            snapshot
        };

        let result = self.messages.mark_read(conversation_id, viewer_id).await;

        let mut state = self.state();
        state.marking_read.remove(&conversation_id);

        match result {
            Ok(updated) => {
                debug!(conversation_id = %conversation_id, updated, "Conversation marked read");
                Ok(ReadOutcome::Marked { updated })
            }
            Err(source) => {
                warn!(
                    conversation_id = %conversation_id,
                    error = %source,
                    "Read update rejected, restoring unread state"
                );
                // A refresh during the call already reloaded the true count
                if state.unread_epoch == snapshot.unread_epoch {
                    if let Some(conversation) = state.conversations.get_mut(&conversation_id) {
                        conversation.unread_count += snapshot.unread_count;
                    }
                }
                if let Some(thread) = state.threads.get_mut(&conversation_id) {
                    for (message_id, previous) in snapshot.statuses {
                        if let Some(message) = thread
                            .messages
                            .iter_mut()
                            .find(|m| m.id == message_id && m.status == MessageStatus::Read)
                        {
                            message.status = previous;
                        }
                    }
                }
                Err(ThreadError::MarkRead {
                    conversation_id,
                    source,
                })
            }
        }
    }

    /// Tear down a conversation: attachments, then the record, then local state.
    pub async fn delete_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<DeleteReport, ThreadError> {
        let mut report = DeleteReport::default();
        let prefix = Attachment::conversation_prefix(conversation_id);
        let batch_size = self.config.attachment_batch_size.max(1);

        let mut paths = Vec::new();
        loop {
            match self.attachments.list(&prefix, batch_size, paths.len()).await {
                Ok(page) => {
                    let short = page.len() < batch_size;
                    paths.extend(page);
                    if short {
                        break;
                    }
                }
                Err(e) => {
                    warn!(conversation_id = %conversation_id, error = %e, "Failed to list attachments");
                    report.warnings.push(format!("Failed to list attachments: {e}"));
                    break;
                }
            }
        }

        for batch in paths.chunks(batch_size) {
            match self.attachments.remove(batch).await {
                Ok(()) => report.attachments_removed += batch.len(),
                Err(e) => {
                    warn!(
                        conversation_id = %conversation_id,
                        count = batch.len(),
                        error = %e,
                        "Failed to delete attachments"
                    );
                    report
                        .warnings
                        .push(format!("Failed to delete {} attachments: {e}", batch.len()));
                }
            }
        }

        self.conversations
            .delete(conversation_id)
            .await
            .map_err(|source| ThreadError::Delete {
                conversation_id,
                source,
            })?;

        let mut state = self.state();
        state.conversations.remove(&conversation_id);
        state.threads.remove(&conversation_id);
        state.marking_read.remove(&conversation_id);
        if state.active == Some(conversation_id) {
            state.active = None;
        }

        info!(
            conversation_id = %conversation_id,
            attachments_removed = report.attachments_removed,
            warnings = report.warnings.len(),
            "Conversation deleted"
        );
        Ok(report)
    }

    /// Apply a message pushed by the realtime feed.
    ///
    /// Known messages only have their status advanced; one from the other
    /// participant reaching `read` leaves the unread count. New messages are
    /// appended to a loaded window, held until the initial page lands for a
    /// window still loading, and counted as unread when they come from the
    /// other participant.
    pub fn receive_message(&self, message: Message) {
        let viewer_id = self.viewer_id;
        let mut state = self.state();
        let CacheState {
            conversations,
            threads,
            ..
        } = &mut *state;

        if let Some(thread) = threads.get_mut(&message.conversation_id) {
            let known = thread
                .messages
                .iter_mut()
                .chain(thread.pending.iter_mut())
                .find(|m| m.id == message.id);
            if let Some(existing) = known {
                let was_unread =
                    !existing.is_from(viewer_id) && existing.status != MessageStatus::Read;
                if existing.status.advance(message.status)
                    && was_unread
                    && existing.status == MessageStatus::Read
                {
                    if let Some(conversation) = conversations.get_mut(&message.conversation_id) {
                        conversation.unread_count = conversation.unread_count.saturating_sub(1);
                    }
                }
                return;
            }

            if thread.is_loaded() {
                let at = thread
                    .messages
                    .partition_point(|m| Message::chronological(m, &message).is_lt());
                thread.messages.insert(at, message.clone());
            } else if thread.loading {
                thread.pending.push(message.clone());
            }
        }

        state.apply_latest(&message);
        if !message.is_from(viewer_id) && message.status != MessageStatus::Read {
            if let Some(conversation) = state.conversations.get_mut(&message.conversation_id) {
                conversation.unread_count += 1;
            }
        }
    }

    /// Send a message as the viewer and add it to the local thread.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        content: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Message, ThreadError> {
        let content = content.filter(|c| !c.trim().is_empty());
        if content.is_none() && attachment.is_none() {
            return Err(ThreadError::EmptyMessage);
        }

        let message = self
            .messages
            .insert(NewMessage {
                conversation_id,
                sender_id: self.viewer_id,
                content,
                attachment,
            })
            .await
            .map_err(ThreadError::Send)?;

        self.receive_message(message.clone());
        Ok(message)
    }

    /// Timestamp of the oldest loaded message, if any.
    pub fn cursor(&self, conversation_id: Uuid) -> Option<DateTime<Utc>> {
        self.state()
            .threads
            .get(&conversation_id)
            .and_then(|thread| thread.oldest)
    }
}
