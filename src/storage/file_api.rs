//! Bucket-scoped object operations.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};
use url::Url;

use super::types::{
    FileObject, FileOptions, SearchOptions, SignedUrl, SignedUrlResponse, UploadSource,
    DEFAULT_CONTENT_TYPE,
};
use crate::client::RequestExecutor;
use crate::request::{Headers, Method};
use crate::transfer::{
    percentage, ProgressContent, StateGate, StreamCopier, TransferControl, UploadState,
};
use crate::{Error, ErrorContext, Result};

/// Object operations against one bucket of the storage service.
///
/// Object keys are always `{bucket_id}/{path}`.
#[derive(Debug, Clone)]
pub struct StorageFileApi {
    url: String,
    bucket_id: String,
    executor: RequestExecutor,
    copier: StreamCopier,
}

impl StorageFileApi {
    /// `url` is the storage service root, e.g. `https://xyz.supabase.co/storage/v1`.
    pub fn new(url: impl Into<String>, bucket_id: impl Into<String>, executor: RequestExecutor) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            bucket_id: bucket_id.into(),
            executor,
            copier: StreamCopier::default(),
        }
    }

    pub fn with_copier(mut self, copier: StreamCopier) -> Self {
        self.copier = copier;
        self
    }

    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    fn final_path(&self, path: &str) -> String {
        format!("{}/{}", self.bucket_id, path)
    }

    fn object_url(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/object/{}", self.url, self.final_path(path));
        Url::parse(&raw).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid object URL: {}", e),
                ErrorContext::new().with_details(raw).with_source("storage"),
            )
        })
    }

    /// Upload a new object and return its key.
    ///
    /// Without an explicit content type one is inferred from the local file
    /// name, or from `path` for in-memory data.
    pub async fn upload(
        &self,
        source: impl Into<UploadSource>,
        path: &str,
        options: Option<FileOptions>,
        control: &TransferControl,
    ) -> Result<String> {
        let source = source.into();
        let mut options = options.unwrap_or_default();
        if options.content_type.is_none() {
            let guess_from = match &source {
                UploadSource::File(local) => local.as_path(),
                UploadSource::Bytes(_) => Path::new(path),
            };
            options.content_type = mime_guess::from_path(guess_from)
                .first()
                .map(|mime| mime.essence_str().to_string());
        }
        self.upload_or_update(source, path, &options, control).await
    }

    /// Replace an existing object. Same request as `upload`; no type inference.
    pub async fn update(
        &self,
        source: impl Into<UploadSource>,
        path: &str,
        options: Option<FileOptions>,
        control: &TransferControl,
    ) -> Result<String> {
        let options = options.unwrap_or_default();
        self.upload_or_update(source.into(), path, &options, control)
            .await
    }

    async fn upload_or_update(
        &self,
        source: UploadSource,
        path: &str,
        options: &FileOptions,
        control: &TransferControl,
    ) -> Result<String> {
        let url = self.object_url(path)?;
        let upload = match source {
            UploadSource::Bytes(data) => {
                PreparedUpload::new(ProgressContent::from_bytes(data).with_control(control.clone()))
            }
            UploadSource::File(local) => {
                let content = ProgressContent::from_file(&local).await?;
                PreparedUpload::new(content.with_control(control.clone()))
            }
        };

        let mut upload_headers = Headers::new();
        upload_headers.insert("cache-control", format!("max-age={}", options.cache_control));
        upload_headers.insert(
            "content-type",
            options
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        );
        if options.upsert {
            upload_headers.insert("x-upsert", "true");
        }
        if let Some(length) = upload.length {
            upload_headers.insert("content-length", length.to_string());
        }
        let headers = self.executor.merge_headers(Some(&upload_headers));

        let sent = upload.sent;
        let gate = upload.gate;
        // a zero-length body is never polled, so the states cannot rely on it
        gate.advance(control, UploadState::PendingUpload);
        let result = self
            .executor
            .send(Method::Post, url, &headers, Some(upload.body))
            .await;

        let response = match result {
            Ok(response) => response,
            Err(Error::Transport(_)) if control.token().is_cancelled() => {
                return Err(Error::Cancelled {
                    bytes_transferred: sent.load(Ordering::Relaxed),
                })
            }
            Err(e) => return Err(e),
        };
        gate.advance(control, UploadState::PendingResponse);
        // drain so the connection goes back to the pool
        let _ = response.bytes().await;
        gate.advance(control, UploadState::Complete);

        Ok(self.final_path(path))
    }

    /// Download an object into memory.
    pub async fn download(&self, path: &str, control: &TransferControl) -> Result<Bytes> {
        let mut buffer = Vec::new();
        self.download_into(path, &mut buffer, control).await?;
        Ok(Bytes::from(buffer))
    }

    /// Download an object into `local_path`, creating or truncating it.
    ///
    /// On failure the partially written file is left for the caller to remove.
    pub async fn download_to(
        &self,
        path: &str,
        local_path: impl AsRef<Path>,
        control: &TransferControl,
    ) -> Result<PathBuf> {
        let local_path = local_path.as_ref().to_path_buf();
        let mut file = tokio::fs::File::create(&local_path).await?;
        self.download_into(path, &mut file, control).await?;
        Ok(local_path)
    }

    /// Download an object into any writer. Returns the number of bytes copied.
    pub async fn download_into<W>(
        &self,
        path: &str,
        destination: &mut W,
        control: &TransferControl,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self.object_url(path)?;
        let headers = self.executor.merge_headers(None);
        let response = self.executor.send(Method::Get, url, &headers, None).await?;

        let total = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(Box::pin(stream));

        let on_bytes = match (control.progress_observer(), total) {
            (Some(observer), Some(total)) if total > 0 => {
                let observer = observer.clone();
                Some(move |copied: u64| {
                    if let Some(pct) = percentage(copied, total) {
                        observer.on_progress(pct);
                    }
                })
            }
            _ => None,
        };

        let copied = self
            .copier
            .copy(&mut reader, destination, on_bytes, control.token())
            .await?;
        debug!(bucket = self.bucket_id.as_str(), path, bytes = copied, "download finished");
        Ok(copied)
    }

    /// List objects under `prefix`.
    pub async fn list(&self, prefix: &str, options: Option<SearchOptions>) -> Result<Vec<FileObject>> {
        let options = options.unwrap_or_default();
        let mut body = serde_json::to_value(&options)?;
        if let Some(map) = body.as_object_mut() {
            map.insert("prefix".to_string(), json!(prefix));
        }

        let url = format!("{}/object/list/{}", self.url, self.bucket_id);
        let response = self
            .executor
            .execute_typed::<Vec<FileObject>, _>(Method::Post, &url, Some(&body), None)
            .await?;
        Ok(response.into_model())
    }

    /// Move (or rename) an object, reporting only whether it worked.
    ///
    /// Every failure, including transport errors, becomes `false`. Use
    /// [`try_move_object`](Self::try_move_object) to see the error.
    pub async fn move_object(&self, from_path: &str, to_path: &str) -> bool {
        match self.try_move_object(from_path, to_path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(from = from_path, to = to_path, error = %e, "move failed");
                false
            }
        }
    }

    /// Move an object, raising on failure. Any 2xx counts as success,
    /// whatever its body.
    pub async fn try_move_object(&self, from_path: &str, to_path: &str) -> Result<()> {
        let body = json!({
            "bucketId": self.bucket_id,
            "sourceKey": from_path,
            "destinationKey": to_path,
        });
        let url = format!("{}/object/move", self.url);
        self.executor
            .execute(Method::Post, &url, Some(&body), None)
            .await?;
        Ok(())
    }

    /// Delete objects; returns the removed entries.
    pub async fn remove<I, S>(&self, paths: I) -> Result<Vec<FileObject>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = paths.into_iter().map(Into::into).collect();
        let body = json!({ "prefixes": prefixes });
        let url = format!("{}/object/{}", self.url, self.bucket_id);
        let response = self
            .executor
            .execute_typed::<Vec<FileObject>, _>(Method::Delete, &url, Some(&body), None)
            .await?;
        Ok(response.into_model())
    }

    /// Time-limited download link for one object.
    pub async fn create_signed_url(&self, path: &str, expires_in: u64) -> Result<String> {
        let body = json!({ "expiresIn": expires_in });
        let url = format!("{}/object/sign/{}", self.url, self.final_path(path));
        let response = self
            .executor
            .execute_typed::<SignedUrlResponse, _>(Method::Post, &url, Some(&body), None)
            .await?;
        Ok(format!("{}{}", self.url, response.model.signed_url))
    }

    /// Signed links for several objects; every returned URL is absolute.
    pub async fn create_signed_urls<I, S>(&self, paths: I, expires_in: u64) -> Result<Vec<SignedUrl>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        let body = json!({ "expiresIn": expires_in, "paths": paths });
        let url = format!("{}/object/sign/{}", self.url, self.bucket_id);
        let mut entries = self
            .executor
            .execute_typed::<Vec<SignedUrl>, _>(Method::Post, &url, Some(&body), None)
            .await?
            .into_model();

        for entry in &mut entries {
            if let Some(relative) = entry.signed_url.take() {
                entry.signed_url = Some(format!("{}{}", self.url, relative));
            }
        }
        Ok(entries)
    }

    /// Public URL of an object in a public bucket. No request is made.
    pub fn get_public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}", self.url, self.final_path(path))
    }
}

/// Upload body with its length and sent-bytes counter split out.
struct PreparedUpload {
    body: reqwest::Body,
    length: Option<u64>,
    sent: Arc<AtomicU64>,
    gate: StateGate,
}

impl PreparedUpload {
    fn new<R: AsyncRead + Send + Unpin + 'static>(content: ProgressContent<R>) -> Self {
        let length = content.length();
        let sent = content.sent_bytes();
        let gate = content.state_gate();
        Self {
            body: content.into_body(),
            length,
            sent,
            gate,
        }
    }
}
