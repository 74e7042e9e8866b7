use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation entity - a thread between a client and a lawyer.
///
/// `unread_count` is scoped to whoever loaded the conversation: it counts
/// messages from the other participant that have not reached `read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// The client who opened the conversation.
    pub requester_id: Uuid,
    /// The lawyer on the other side.
    pub provider_id: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_preview: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new, empty conversation between two participants.
    pub fn new(requester_id: Uuid, provider_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_id,
            provider_id,
            last_message_at: None,
            last_message_preview: None,
            unread_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.provider_id == user_id
    }

    /// The participant that is not `viewer_id`, if `viewer_id` takes part at all.
    pub fn other_participant(&self, viewer_id: Uuid) -> Option<Uuid> {
        if self.requester_id == viewer_id {
            Some(self.provider_id)
        } else if self.provider_id == viewer_id {
            Some(self.requester_id)
        } else {
            None
        }
    }

    /// Timestamp used to order the conversation list, newest activity first.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_participant() {
        let client = Uuid::new_v4();
        let lawyer = Uuid::new_v4();
        let conversation = Conversation::new(client, lawyer);

        assert_eq!(conversation.other_participant(client), Some(lawyer));
        assert_eq!(conversation.other_participant(lawyer), Some(client));
        assert_eq!(conversation.other_participant(Uuid::new_v4()), None);
        assert!(conversation.involves(lawyer));
    }
}
