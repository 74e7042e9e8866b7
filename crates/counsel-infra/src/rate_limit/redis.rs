//! Redis rate limiter using the same fixed-window counter as the in-memory one.
//!
//! Opt-in only: sharing counters through Redis turns the per-instance limit
//! into one global limit across every warm instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use counsel_core::ports::{
    RateLimitDecision, RateLimitError, RateLimitKey, RateLimitPolicy, RateLimiter,
};

/// Connection and key settings for [`RedisRateLimiter`].
#[derive(Debug, Clone)]
pub struct RedisRateLimitConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// Namespace for counter keys, `{prefix}:{bucket}:{client}`.
    pub key_prefix: String,
}

impl Default for RedisRateLimitConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            key_prefix: "ratelimit".to_string(),
        }
    }
}

impl RedisRateLimitConfig {
    /// Read `REDIS_URL`, `REDIS_CONNECT_TIMEOUT_SECS` and `RATE_LIMIT_KEY_PREFIX`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            connect_timeout: std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        }
    }
}

// Returns {allowed, pttl_ms, count}. A denied request does not consume a slot.
const FIXED_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local max_requests = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])

local current = tonumber(redis.call('GET', key) or '0')
if current >= max_requests and current > 0 then
    return {0, redis.call('PTTL', key), current}
end

current = redis.call('INCR', key)
if current == 1 then
    redis.call('PEXPIRE', key, window_ms)
end
return {1, redis.call('PTTL', key), current}
"#;

fn backend_error(err: redis::RedisError) -> RateLimitError {
    RateLimitError::Backend(err.to_string())
}

/// Redis-backed fixed-window rate limiter.
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    config: RedisRateLimitConfig,
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(config: RedisRateLimitConfig) -> Result<Self, RateLimitError> {
        let client = Client::open(config.url.as_str()).map_err(backend_error)?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                RateLimitError::Backend(format!(
                    "connecting to {} timed out after {:?}",
                    config.url, config.connect_timeout
                ))
            })?
            .map_err(backend_error)?;

        tracing::info!(url = %config.url, prefix = %config.key_prefix, "Redis rate limiter connected");

        Ok(Self {
            conn,
            config,
            script: Script::new(FIXED_WINDOW_SCRIPT),
        })
    }

    pub async fn from_env() -> Result<Self, RateLimitError> {
        Self::new(RedisRateLimitConfig::from_env()).await
    }

    fn counter_key(&self, key: &RateLimitKey) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let window_ms = u64::try_from(policy.window.as_millis()).unwrap_or(u64::MAX);
        let mut conn = self.conn.clone();

        let (allowed, pttl_ms, count): (i64, i64, i64) = self
            .script
            .key(self.counter_key(key))
            .arg(policy.max_requests)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(backend_error)?;

        // PTTL is negative when the key has no expiry left
        let ttl_ms = u64::try_from(pttl_ms).ok().filter(|ms| *ms > 0).unwrap_or(window_ms);
        let count = u32::try_from(count).unwrap_or(u32::MAX);

        if allowed == 1 {
            Ok(RateLimitDecision::Allowed {
                remaining: policy.max_requests.saturating_sub(count),
            })
        } else {
            Ok(RateLimitDecision::Denied {
                retry_after_secs: ttl_ms.div_ceil(1000),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Skips when no Redis is reachable at REDIS_URL.
    async fn connect() -> Option<RedisRateLimiter> {
        let config = RedisRateLimitConfig {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into()),
            connect_timeout: Duration::from_secs(1),
            key_prefix: format!("test_ratelimit_{}", uuid::Uuid::new_v4()),
        };
        RedisRateLimiter::new(config).await.ok()
    }

    #[tokio::test]
    async fn test_fixed_window_in_redis() {
        let Some(limiter) = connect().await else {
            return;
        };

        let key = RateLimitKey::new("embed", "198.51.100.4");
        let policy = RateLimitPolicy::from_millis(1_000, 2);

        assert_eq!(
            limiter.check(&key, &policy).await.unwrap(),
            RateLimitDecision::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.check(&key, &policy).await.unwrap(),
            RateLimitDecision::Allowed { remaining: 0 }
        );
        assert_eq!(
            limiter.check(&key, &policy).await.unwrap(),
            RateLimitDecision::Denied { retry_after_secs: 1 }
        );

        let other = RateLimitKey::new("embed", "192.0.2.1");
        assert!(limiter.check(&other, &policy).await.unwrap().is_allowed());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(limiter.check(&key, &policy).await.unwrap().is_allowed());
    }
}
