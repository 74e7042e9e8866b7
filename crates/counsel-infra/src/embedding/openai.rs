//! HTTP client for OpenAI-compatible `/embeddings` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use counsel_core::ports::{Embedding, EmbeddingError, EmbeddingProvider};

/// Embedding API configuration.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("EMBEDDING_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("EMBEDDING_API_BASE").unwrap_or(defaults.base_url),
            timeout: std::env::var("EMBEDDING_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding client for OpenAI-compatible APIs.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingClient {
    client: reqwest::Client,
    model: String,
    endpoint: String,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = config
            .api_key
            .ok_or_else(|| EmbeddingError::Config("EMBEDDING_API_KEY is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| EmbeddingError::Config(format!("invalid API key header value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            model: config.model,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    async fn embed(&self, input: &str) -> Result<Embedding, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Upstream(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Embedding API returned an error");
            return Err(EmbeddingError::Upstream(format!(
                "embedding API returned {status}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".to_string()))?;

        tracing::debug!(dimensions = vector.len(), "Embedding generated");
        Ok(Embedding {
            vector,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenAiEmbeddingClient {
        OpenAiEmbeddingClient::new(EmbeddingConfig {
            api_key: Some("test-api-key".to_string()),
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn embed_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": "family law attorney in Austin"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{"object": "embedding", "index": 0, "embedding": [0.25, -0.5, 1.0]}],
                "model": "text-embedding-3-small"
            })))
            .mount(&server)
            .await;

        let embedding = test_client(&server.uri())
            .embed("family law attorney in Austin")
            .await
            .unwrap();

        assert_eq!(embedding.vector, vec![0.25, -0.5, 1.0]);
        assert_eq!(embedding.model, "text-embedding-3-small");
    }

    #[tokio::test]
    async fn embed_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let result = test_client(&server.uri()).embed("hello").await;

        assert!(matches!(result, Err(EmbeddingError::Upstream(_))));
    }

    #[tokio::test]
    async fn embed_empty_data_is_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})),
            )
            .mount(&server)
            .await;

        let result = test_client(&server.uri()).embed("hello").await;

        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let result = OpenAiEmbeddingClient::new(EmbeddingConfig::default());
        assert!(matches!(result, Err(EmbeddingError::Config(_))));
    }
}
