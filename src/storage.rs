//! Object storage sub-API.

pub mod file_api;
pub mod types;

pub use file_api::StorageFileApi;
pub use types::{
    FileObject, FileOptions, SearchOptions, SignedUrl, SortBy, UploadSource, DEFAULT_CONTENT_TYPE,
};

use crate::client::RequestExecutor;

/// Entry point to the storage service; hands out bucket-scoped APIs.
#[derive(Debug, Clone)]
pub struct StorageClient {
    url: String,
    executor: RequestExecutor,
}

impl StorageClient {
    pub fn new(url: impl Into<String>, executor: RequestExecutor) -> Self {
        Self {
            url: url.into(),
            executor,
        }
    }

    /// Object operations for `bucket_id`.
    pub fn from(&self, bucket_id: impl Into<String>) -> StorageFileApi {
        StorageFileApi::new(self.url.clone(), bucket_id, self.executor.clone())
    }
}
