//! Error body returned by every failing endpoint.

use serde::{Deserialize, Serialize};

/// `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    // Common error constructors
    pub fn rate_limited() -> Self {
        Self::new("Too many requests. Please try again later.")
    }

    pub fn internal_error() -> Self {
        Self::new("Internal server error")
    }
}
