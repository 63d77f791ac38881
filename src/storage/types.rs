//! Storage request options and response models.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

/// An object (or folder placeholder) in a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileObject {
    pub name: String,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_accessed_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl FileObject {
    /// Folder placeholders are listed without an id.
    pub fn is_folder(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub column: String,
    pub order: String,
}

impl Default for SortBy {
    fn default() -> Self {
        Self {
            column: "name".to_string(),
            order: "asc".to_string(),
        }
    }
}

/// Options for listing a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "sortBy")]
    pub sort_by: SortBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            sort_by: SortBy::default(),
            search: None,
        }
    }
}

/// Upload/update options, sent as headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    /// Seconds, sent as `cache-control: max-age=<value>`.
    pub cache_control: String,
    /// `None` lets `upload` infer the type from the path.
    pub content_type: Option<String>,
    pub upsert: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            cache_control: "3600".to_string(),
            content_type: None,
            upsert: false,
        }
    }
}

impl FileOptions {
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn cache_control(mut self, seconds: u64) -> Self {
        self.cache_control = seconds.to_string();
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }
}

/// Where upload bytes come from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Bytes(Bytes),
    File(PathBuf),
}

impl From<Bytes> for UploadSource {
    fn from(data: Bytes) -> Self {
        UploadSource::Bytes(data)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(data: Vec<u8>) -> Self {
        UploadSource::Bytes(Bytes::from(data))
    }
}

impl From<&'static [u8]> for UploadSource {
    fn from(data: &'static [u8]) -> Self {
        UploadSource::Bytes(Bytes::from_static(data))
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::File(path)
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        UploadSource::File(path.to_path_buf())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    pub signed_url: String,
}

/// One entry of a batch signed-URL response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    #[serde(default)]
    pub path: Option<String>,
    /// Absolute once returned by `create_signed_urls`.
    #[serde(rename = "signedURL", default)]
    pub signed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
