//! Object storage client for message attachments.
//!
//! Speaks the storage REST API of the hosted backend: objects are listed
//! per folder prefix and removed in bulk by path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use counsel_core::error::RepoError;
use counsel_core::ports::AttachmentStore;

/// Storage API configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base URL of the storage API, e.g. `https://<project>.example.co/storage/v1`.
    pub base_url: String,
    pub bucket: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl StorageConfig {
    /// Load configuration from environment variables. `None` when no storage URL is set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("STORAGE_URL").ok()?;
        Some(Self {
            base_url,
            bucket: std::env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "message-attachments".to_string()),
            api_key: std::env::var("STORAGE_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(
                std::env::var("STORAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Deserialize)]
struct ListedObject {
    name: String,
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

/// HTTP attachment store.
#[derive(Debug, Clone)]
pub struct HttpAttachmentStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl HttpAttachmentStore {
    pub fn new(config: StorageConfig) -> Result<Self, RepoError> {
        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| RepoError::Storage(format!("invalid API key header value: {e}")))?;
            let api_key = HeaderValue::from_str(&config.api_key)
                .map_err(|e| RepoError::Storage(format!("invalid API key header value: {e}")))?;
            headers.insert(AUTHORIZATION, bearer);
            headers.insert("apikey", api_key);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RepoError::Storage(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn error_for(response: reqwest::Response) -> RepoError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        RepoError::Storage(format!("storage API returned {status}: {body}"))
    }
}

#[async_trait]
impl AttachmentStore for HttpAttachmentStore {
    async fn list(
        &self,
        prefix: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>, RepoError> {
        let folder = prefix.trim_end_matches('/');
        let response = self
            .client
            .post(self.url(&format!("object/list/{}", self.config.bucket)))
            .json(&ListRequest {
                prefix: folder,
                limit,
                offset,
                sort_by: SortBy {
                    column: "name",
                    order: "asc",
                },
            })
            .send()
            .await
            .map_err(|e| RepoError::Storage(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let objects: Vec<ListedObject> = response
            .json()
            .await
            .map_err(|e| RepoError::Storage(format!("invalid list response: {e}")))?;

        Ok(objects
            .into_iter()
            .map(|object| format!("{folder}/{}", object.name))
            .collect())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), RepoError> {
        if paths.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .delete(self.url(&format!("object/{}", self.config.bucket)))
            .json(&RemoveRequest { prefixes: paths })
            .send()
            .await
            .map_err(|e| RepoError::Storage(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        tracing::debug!(bucket = %self.config.bucket, count = paths.len(), "Attachments removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_store(base_url: &str) -> HttpAttachmentStore {
        HttpAttachmentStore::new(StorageConfig {
            base_url: base_url.to_string(),
            bucket: "attachments".to_string(),
            api_key: "service-key".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn list_prefixes_object_names() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/object/list/attachments"))
            .and(header("authorization", "Bearer service-key"))
            .and(body_json(serde_json::json!({
                "prefix": "conv-1",
                "limit": 100,
                "offset": 0,
                "sortBy": {"column": "name", "order": "asc"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "contract.pdf"},
                {"name": "id-scan.png"}
            ])))
            .mount(&server)
            .await;

        let paths = test_store(&server.uri())
            .list("conv-1/", 100, 0)
            .await
            .unwrap();

        assert_eq!(paths, vec!["conv-1/contract.pdf", "conv-1/id-scan.png"]);
    }

    #[tokio::test]
    async fn remove_sends_paths_as_prefixes() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/object/attachments"))
            .and(body_json(serde_json::json!({"prefixes": ["conv-1/contract.pdf"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        test_store(&server.uri())
            .remove(&["conv-1/contract.pdf".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_error_status_is_storage_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let result = test_store(&server.uri()).list("conv-1/", 100, 0).await;

        assert!(matches!(result, Err(RepoError::Storage(msg)) if msg.contains("403")));
    }
}
