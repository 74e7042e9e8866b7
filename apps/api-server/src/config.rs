//! Application configuration loaded from environment variables.

use std::env;

use counsel_core::ports::RateLimitPolicy;
use counsel_infra::EmbeddingConfig;

/// Where rate limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    /// Per-process counters (default).
    Memory,
    /// Counters shared by every instance through Redis.
    Redis,
}

impl RateLimitBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "redis" => RateLimitBackend::Redis,
            "memory" | "" => RateLimitBackend::Memory,
            other => {
                tracing::warn!(backend = %other, "Unknown RATE_LIMIT_BACKEND, using memory");
                RateLimitBackend::Memory
            }
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub embedding: EmbeddingConfig,
    pub rate_limit: RateLimitPolicy,
    pub rate_limit_backend: RateLimitBackend,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = RateLimitPolicy::default();
        let window_ms = env::var("RATE_LIMIT_WINDOW_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.window.as_millis() as u64);
        let max_requests = env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_requests);

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            embedding: EmbeddingConfig::from_env(),
            rate_limit: RateLimitPolicy::from_millis(window_ms, max_requests),
            rate_limit_backend: env::var("RATE_LIMIT_BACKEND")
                .map(|v| RateLimitBackend::parse(&v))
                .unwrap_or(RateLimitBackend::Memory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!(RateLimitBackend::parse("Redis"), RateLimitBackend::Redis);
        assert_eq!(RateLimitBackend::parse(" memory "), RateLimitBackend::Memory);
        assert_eq!(RateLimitBackend::parse("dynamo"), RateLimitBackend::Memory);
    }
}
