//! # Counsel Core
//!
//! The domain layer of the Counsel messaging backend.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! conversation and message types, the ports infrastructure must implement,
//! and the client-side conversation thread cache.

pub mod domain;
pub mod error;
pub mod ports;
pub mod threads;

pub use error::{DomainError, RepoError, ThreadError};
pub use threads::ThreadCache;
