//! Conversation entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub requester_id: Uuid,
    pub provider_id: Uuid,
    pub last_message_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_message_preview: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::message::Entity")]
    Message,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to Domain Conversation.
/// Unread counts are per viewer and filled in by the caller.
impl From<Model> for counsel_core::domain::Conversation {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            requester_id: model.requester_id,
            provider_id: model.provider_id,
            last_message_at: model.last_message_at.map(Into::into),
            last_message_preview: model.last_message_preview,
            unread_count: 0,
            created_at: model.created_at.into(),
        }
    }
}

/// Conversion from Domain Conversation to SeaORM ActiveModel.
impl From<counsel_core::domain::Conversation> for ActiveModel {
    fn from(conversation: counsel_core::domain::Conversation) -> Self {
        Self {
            id: Set(conversation.id),
            requester_id: Set(conversation.requester_id),
            provider_id: Set(conversation.provider_id),
            last_message_at: Set(conversation.last_message_at.map(Into::into)),
            last_message_preview: Set(conversation.last_message_preview),
            created_at: Set(conversation.created_at.into()),
        }
    }
}
