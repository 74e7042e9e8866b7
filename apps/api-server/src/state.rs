//! Application state - shared across all handlers.

use std::sync::Arc;

use counsel_core::ports::{EmbeddingProvider, RateLimitPolicy, RateLimiter};
use counsel_infra::{InMemoryRateLimiter, OpenAiEmbeddingClient};

use crate::config::{AppConfig, RateLimitBackend};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub rate_limit_policy: RateLimitPolicy,
    /// Set when counters are kept in this process and need periodic sweeping.
    pub local_limiter: Option<Arc<InMemoryRateLimiter>>,
    /// `None` when the embedding API is not configured.
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let embedder: Option<Arc<dyn EmbeddingProvider>> =
            match OpenAiEmbeddingClient::new(config.embedding.clone()) {
                Ok(client) => {
                    tracing::info!(model = %client.model(), "Embedding client configured");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Embedding client unavailable, /api/embed will fail");
                    None
                }
            };

        let mut state = Self::in_memory(config.rate_limit, embedder);

        if config.rate_limit_backend == RateLimitBackend::Redis {
            state.use_redis_backend().await;
        }

        tracing::info!(
            window_ms = state.rate_limit_policy.window.as_millis() as u64,
            max_requests = state.rate_limit_policy.max_requests,
            distributed = state.local_limiter.is_none(),
            "Application state initialized"
        );
        state
    }

    /// State with per-process rate limit counters.
    pub fn in_memory(
        rate_limit_policy: RateLimitPolicy,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        Self {
            rate_limiter: limiter.clone(),
            rate_limit_policy,
            local_limiter: Some(limiter),
            embedder,
        }
    }

    #[cfg(feature = "redis")]
    async fn use_redis_backend(&mut self) {
        match counsel_infra::RedisRateLimiter::from_env().await {
            Ok(limiter) => {
                tracing::warn!("Rate limits are shared across instances through Redis");
                self.rate_limiter = Arc::new(limiter);
                self.local_limiter = None;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to connect to Redis. Using per-process rate limits."
                );
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn use_redis_backend(&mut self) {
        tracing::error!("RATE_LIMIT_BACKEND=redis but built without the redis feature");
    }
}
