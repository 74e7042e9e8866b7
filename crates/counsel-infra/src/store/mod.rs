//! Store implementations that keep everything in process memory.

mod memory;

pub use memory::{InMemoryAttachmentStore, InMemoryConversationStore, InMemoryMessageStore};
