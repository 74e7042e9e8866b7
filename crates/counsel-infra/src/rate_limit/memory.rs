//! In-memory fixed-window rate limiter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use counsel_core::ports::{
    Clock, RateLimitDecision, RateLimitError, RateLimitKey, RateLimitPolicy, RateLimiter,
    SystemClock,
};

struct WindowCounter {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Per-key fixed-window counter table.
///
/// Each key gets `max_requests` slots per window; the counter is replaced,
/// not merged, once the window has elapsed. Bursts of up to twice the
/// nominal rate are possible across a window boundary.
/// Note: Limits are per-process, not distributed across instances.
pub struct InMemoryRateLimiter {
    counters: Mutex<HashMap<String, WindowCounter>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Drop counters whose window has elapsed. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, counter| now < counter.reset_at);
        let removed = before - counters.len();
        tracing::debug!(removed, remaining = counters.len(), "Rate limit table swept");
        removed
    }

    /// Number of tracked keys, expired or not.
    pub async fn tracked_keys(&self) -> usize {
        self.counters.lock().await.len()
    }

    fn window_end(now: DateTime<Utc>, policy: &RateLimitPolicy) -> DateTime<Utc> {
        let window_ms = i64::try_from(policy.window.as_millis()).unwrap_or(i64::MAX);
        TimeDelta::try_milliseconds(window_ms)
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let now = self.clock.now();
        let mut counters = self.counters.lock().await;

        let counter = counters
            .entry(key.to_string())
            .or_insert(WindowCounter {
                count: 0,
                reset_at: now,
            });

        if now >= counter.reset_at {
            *counter = WindowCounter {
                count: 1,
                reset_at: Self::window_end(now, policy),
            };
            return Ok(RateLimitDecision::Allowed {
                remaining: policy.max_requests.saturating_sub(1),
            });
        }

        if counter.count >= policy.max_requests {
            return Ok(RateLimitDecision::denied_until(counter.reset_at, now));
        }

        counter.count += 1;
        Ok(RateLimitDecision::Allowed {
            remaining: policy.max_requests.saturating_sub(counter.count),
        })
    }
}
