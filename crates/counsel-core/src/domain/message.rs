use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Preview length used for conversation list entries.
const PREVIEW_CHARS: usize = 80;

/// Delivery status of a message. Variants are ordered: `Sent < Delivered < Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }

    /// Move to `next` if it is further along; statuses never go backwards.
    /// Returns whether the status changed.
    pub fn advance(&mut self, next: MessageStatus) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown message status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for MessageStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "read" => Ok(MessageStatus::Read),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A file stored alongside a message in the attachment store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Object path, always under the `<conversation_id>/` prefix.
    pub path: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<u64>,
}

impl Attachment {
    /// Storage prefix that holds every attachment of a conversation.
    pub fn conversation_prefix(conversation_id: Uuid) -> String {
        format!("{conversation_id}/")
    }
}

/// Message entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    /// `None` for attachment-only messages.
    pub content: Option<String>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub attachment: Option<Attachment>,
}

impl Message {
    /// Total order within a conversation: creation time, then id.
    pub fn chronological(a: &Message, b: &Message) -> Ordering {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn is_from(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id
    }

    /// Short text shown in the conversation list.
    pub fn preview(&self) -> String {
        match (&self.content, &self.attachment) {
            (Some(content), _) if !content.trim().is_empty() => {
                let trimmed = content.trim();
                if trimmed.chars().count() > PREVIEW_CHARS {
                    let cut: String = trimmed.chars().take(PREVIEW_CHARS).collect();
                    format!("{cut}…")
                } else {
                    trimmed.to_string()
                }
            }
            (_, Some(attachment)) => format!("📎 {}", attachment.file_name),
            _ => String::new(),
        }
    }
}

/// A message about to be written by its sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub attachment: Option<Attachment>,
}

impl NewMessage {
    /// Materialize the message with a fresh id, `sent` status and the given timestamp.
    pub fn into_message(self, created_at: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            content: self.content,
            status: MessageStatus::Sent,
            created_at,
            attachment: self.attachment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_moves_forward() {
        let mut status = MessageStatus::Sent;
        assert!(status.advance(MessageStatus::Delivered));
        assert!(status.advance(MessageStatus::Read));
        assert!(!status.advance(MessageStatus::Delivered));
        assert_eq!(status, MessageStatus::Read);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&MessageStatus::Delivered).unwrap(),
            "\"delivered\""
        );
        assert_eq!("read".parse::<MessageStatus>().unwrap(), MessageStatus::Read);
        assert!("seen".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn test_preview_falls_back_to_attachment_name() {
        let message = NewMessage {
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            content: None,
            attachment: Some(Attachment {
                path: "c/retainer.pdf".to_string(),
                file_name: "retainer.pdf".to_string(),
                mime_type: Some("application/pdf".to_string()),
                size_bytes: Some(1024),
            }),
        }
        .into_message(Utc::now());

        assert_eq!(message.preview(), "📎 retainer.pdf");
    }

    #[test]
    fn test_chronological_breaks_ties_by_id() {
        let now = Utc::now();
        let mut a = NewMessage {
            conversation_id: Uuid::nil(),
            sender_id: Uuid::nil(),
            content: Some("a".to_string()),
            attachment: None,
        }
        .into_message(now);
        let mut b = a.clone();
        a.id = Uuid::from_u128(1);
        b.id = Uuid::from_u128(2);

        assert_eq!(Message::chronological(&a, &b), Ordering::Less);
        assert_eq!(Message::chronological(&b, &a), Ordering::Greater);
    }
}
