//! Domain entities - the core business objects.

mod conversation;
mod message;

pub use conversation::Conversation;
pub use message::{Attachment, Message, MessageStatus, NewMessage, ParseStatusError};
