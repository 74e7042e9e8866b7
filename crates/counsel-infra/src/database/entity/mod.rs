//! SeaORM entities backing the message and conversation stores.

pub mod conversation;
pub mod message;
