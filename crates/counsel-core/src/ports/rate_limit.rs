//! Rate limiting port.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Client id used when the forwarded-address header is missing or empty.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Counter key: a named bucket plus a best-effort client identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    bucket: String,
    client: String,
}

impl RateLimitKey {
    pub fn new(bucket: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            client: client.into(),
        }
    }

    /// Build a key from the raw `X-Forwarded-For` header value.
    /// The first comma-separated entry identifies the client.
    pub fn from_forwarded_for(bucket: impl Into<String>, forwarded_for: Option<&str>) -> Self {
        let client = forwarded_for
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|client| !client.is_empty())
            .unwrap_or(UNKNOWN_CLIENT);
        Self::new(bucket, client)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn client(&self) -> &str {
        &self.client
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bucket, self.client)
    }
}

/// Fixed-window policy: at most `max_requests` per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
        }
    }

    pub fn from_millis(window_ms: u64, max_requests: u32) -> Self {
        Self::new(Duration::from_millis(window_ms), max_requests)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from_millis(60_000, 20)
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Denied { retry_after_secs: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    /// Denial for a window that resets at `reset_at`, rounding the wait up to whole seconds.
    pub fn denied_until(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining_ms = (reset_at - now).num_milliseconds().max(0) as u64;
        RateLimitDecision::Denied {
            retry_after_secs: remaining_ms.div_ceil(1000),
        }
    }
}

/// Rate limiter trait - abstraction over rate limiting backends.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Classify a request for `key` and consume one slot if it is allowed.
    async fn check(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError>;
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend error: {0}")]
    Backend(String),
}
