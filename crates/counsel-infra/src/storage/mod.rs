//! Attachment storage backed by a hosted object storage HTTP API.

mod http;

pub use http::{HttpAttachmentStore, StorageConfig};
