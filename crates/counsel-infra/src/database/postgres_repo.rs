//! PostgreSQL store implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use counsel_core::domain::{Conversation, Message, MessageStatus, NewMessage};
use counsel_core::error::RepoError;
use counsel_core::ports::{ConversationStore, MessageStore};

use super::entity::conversation::{self, Entity as ConversationEntity};
use super::entity::message::{self, Entity as MessageEntity};

fn db_error(err: DbErr) -> RepoError {
    match err {
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::RecordNotFound(_) => RepoError::NotFound,
        other => RepoError::Query(other.to_string()),
    }
}

fn into_messages(rows: Vec<message::Model>) -> Result<Vec<Message>, RepoError> {
    rows.into_iter().map(Message::try_from).collect()
}

/// PostgreSQL message store.
pub struct PostgresMessageStore {
    db: DbConn,
}

impl PostgresMessageStore {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn fetch_page(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, RepoError> {
        let mut query =
            MessageEntity::find().filter(message::Column::ConversationId.eq(conversation_id));
        if let Some(before) = before {
            query = query.filter(message::Column::CreatedAt.lt(before.fixed_offset()));
        }

        let rows = query
            .order_by_desc(message::Column::CreatedAt)
            .order_by_desc(message::Column::Id)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        into_messages(rows)
    }

    async fn latest_for_conversations(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<Message>, RepoError> {
        // One row per conversation via DISTINCT ON, then newest first overall.
        let rows = MessageEntity::find()
            .distinct_on([message::Column::ConversationId])
            .filter(message::Column::ConversationId.is_in(conversation_ids.iter().copied()))
            .order_by_asc(message::Column::ConversationId)
            .order_by_desc(message::Column::CreatedAt)
            .order_by_desc(message::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let mut messages = into_messages(rows)?;
        messages.sort_by(|a, b| Message::chronological(b, a));
        Ok(messages)
    }

    async fn count_unread(
        &self,
        conversation_id: Uuid,
        viewer_id: Uuid,
    ) -> Result<u32, RepoError> {
        let count = MessageEntity::find()
            .filter(message::Column::ConversationId.eq(conversation_id))
            .filter(message::Column::SenderId.ne(viewer_id))
            .filter(message::Column::Status.ne(MessageStatus::Read.as_str()))
            .count(&self.db)
            .await
            .map_err(db_error)?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn mark_read(&self, conversation_id: Uuid, viewer_id: Uuid) -> Result<u64, RepoError> {
        let result = MessageEntity::update_many()
            .col_expr(message::Column::Status, Expr::value(MessageStatus::Read.as_str()))
            .filter(message::Column::ConversationId.eq(conversation_id))
            .filter(message::Column::SenderId.ne(viewer_id))
            .filter(message::Column::Status.ne(MessageStatus::Read.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_error)?;

        tracing::debug!(
            conversation_id = %conversation_id,
            rows = result.rows_affected,
            "Messages marked read"
        );
        Ok(result.rows_affected)
    }

    async fn insert(&self, message: NewMessage) -> Result<Message, RepoError> {
        let active: message::ActiveModel = message.into_message(Utc::now()).into();
        let model = active.insert(&self.db).await.map_err(db_error)?;
        Message::try_from(model)
    }
}

/// PostgreSQL conversation store.
pub struct PostgresConversationStore {
    db: DbConn,
}

impl PostgresConversationStore {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn list_for_participant(&self, user_id: Uuid) -> Result<Vec<Conversation>, RepoError> {
        let rows = ConversationEntity::find()
            .filter(
                Condition::any()
                    .add(conversation::Column::RequesterId.eq(user_id))
                    .add(conversation::Column::ProviderId.eq(user_id)),
            )
            .order_by_desc(conversation::Column::LastMessageAt)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, conversation_id: Uuid) -> Result<(), RepoError> {
        let result = ConversationEntity::delete_by_id(conversation_id)
            .exec(&self.db)
            .await
            .map_err(db_error)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
