//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Store-level errors, shared by every message, conversation and attachment backend.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Storage request failed: {0}")]
    Storage(String),
}

/// Failures surfaced by [`crate::ThreadCache`] operations.
///
/// Each variant carries the store error that caused it so callers can show a
/// human-readable notification without the view crashing.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("Conversation {0} is not loaded")]
    UnknownConversation(Uuid),

    #[error("Failed to load conversations: {0}")]
    Conversations(#[source] RepoError),

    #[error("Failed to load messages for conversation {conversation_id}: {source}")]
    Load {
        conversation_id: Uuid,
        #[source]
        source: RepoError,
    },

    #[error("Failed to mark conversation {conversation_id} as read: {source}")]
    MarkRead {
        conversation_id: Uuid,
        #[source]
        source: RepoError,
    },

    #[error("Failed to delete conversation {conversation_id}: {source}")]
    Delete {
        conversation_id: Uuid,
        #[source]
        source: RepoError,
    },

    #[error("Failed to send message: {0}")]
    Send(#[source] RepoError),

    #[error("Message must have content or an attachment")]
    EmptyMessage,
}
