//! Attachment storage port.

use async_trait::async_trait;

use crate::error::RepoError;

/// Object storage holding message attachments.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// List object paths under `prefix`, at most `limit` of them, skipping `offset`.
    async fn list(&self, prefix: &str, limit: usize, offset: usize)
    -> Result<Vec<String>, RepoError>;

    /// Delete the given object paths.
    async fn remove(&self, paths: &[String]) -> Result<(), RepoError>;
}
