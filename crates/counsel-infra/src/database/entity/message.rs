//! Message entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use counsel_core::domain::{Attachment, Message, MessageStatus};
use counsel_core::error::RepoError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    /// One of `sent`, `delivered`, `read`.
    pub status: String,
    pub attachment_path: Option<String>,
    pub attachment_name: Option<String>,
    pub attachment_mime_type: Option<String>,
    pub attachment_size: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::conversation::Entity",
        from = "Column::ConversationId",
        to = "super::conversation::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Conversation,
}

impl Related<super::conversation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to Domain Message.
/// Fails on a status value the domain does not know.
impl TryFrom<Model> for Message {
    type Error = RepoError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status: MessageStatus = model
            .status
            .parse()
            .map_err(|e: counsel_core::domain::ParseStatusError| RepoError::Query(e.to_string()))?;

        let attachment = model.attachment_path.map(|path| Attachment {
            file_name: model
                .attachment_name
                .unwrap_or_else(|| path.rsplit('/').next().unwrap_or_default().to_string()),
            path,
            mime_type: model.attachment_mime_type,
            size_bytes: model.attachment_size.and_then(|size| u64::try_from(size).ok()),
        });

        Ok(Self {
            id: model.id,
            conversation_id: model.conversation_id,
            sender_id: model.sender_id,
            content: model.content,
            status,
            created_at: model.created_at.into(),
            attachment,
        })
    }
}

/// Conversion from Domain Message to SeaORM ActiveModel.
impl From<Message> for ActiveModel {
    fn from(message: Message) -> Self {
        let attachment = message.attachment;
        Self {
            id: Set(message.id),
            conversation_id: Set(message.conversation_id),
            sender_id: Set(message.sender_id),
            content: Set(message.content),
            status: Set(message.status.as_str().to_string()),
            attachment_path: Set(attachment.as_ref().map(|a| a.path.clone())),
            attachment_name: Set(attachment.as_ref().map(|a| a.file_name.clone())),
            attachment_mime_type: Set(attachment.as_ref().and_then(|a| a.mime_type.clone())),
            attachment_size: Set(attachment
                .as_ref()
                .and_then(|a| a.size_bytes)
                .and_then(|size| i64::try_from(size).ok())),
            created_at: Set(message.created_at.into()),
        }
    }
}
