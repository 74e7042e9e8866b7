//! PostgreSQL-backed message and conversation stores.

pub mod entity;
mod postgres_repo;

pub use postgres_repo::{PostgresConversationStore, PostgresMessageStore};

#[cfg(test)]
mod tests;
