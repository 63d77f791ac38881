//! Outbound body that reports upload progress as it is read onto the wire.

use std::io;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::progress::{percentage, StateGate, TransferControl, UploadState};
use crate::Result;

pub const DEFAULT_UPLOAD_BUFFER_SIZE: usize = 4096;

/// A finite byte source wrapped for upload.
///
/// The source is read in `buffer_size` chunks. After each chunk the observer
/// gets `uploaded / length * 100` and an `InProgress` state; `PendingUpload`
/// fires before the first read and `PendingResponse` once the source is
/// drained or its known length has been read. Percentages need a known,
/// non-zero length.
pub struct ProgressContent<R> {
    source: R,
    length: Option<u64>,
    buffer_size: usize,
    control: TransferControl,
    sent: Arc<AtomicU64>,
    gate: StateGate,
}

impl<R> ProgressContent<R>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    pub fn new(source: R, length: Option<u64>) -> Self {
        Self {
            source,
            length,
            buffer_size: DEFAULT_UPLOAD_BUFFER_SIZE,
            control: TransferControl::default(),
            sent: Arc::new(AtomicU64::new(0)),
            gate: StateGate::default(),
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_control(mut self, control: TransferControl) -> Self {
        self.control = control;
        self
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Running count of bytes handed to the wire, readable after the body is consumed.
    pub fn sent_bytes(&self) -> Arc<AtomicU64> {
        self.sent.clone()
    }

    pub(crate) fn state_gate(&self) -> StateGate {
        self.gate.clone()
    }

    /// Chunk stream; a cancelled token ends it with an `Interrupted` error.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let state = UploadCursor {
            buffer: vec![0u8; self.buffer_size],
            source: self.source,
            length: self.length,
            control: self.control,
            sent: self.sent,
            gate: self.gate,
            uploaded: 0,
            started: false,
            drained: false,
        };
        stream::unfold(state, |mut st| async move {
            if st.drained {
                return None;
            }
            if !st.started {
                st.started = true;
                st.gate.advance(&st.control, UploadState::PendingUpload);
            }
            if st.control.token().is_cancelled() {
                debug!(uploaded = st.uploaded, "upload cancelled");
                st.drained = true;
                return Some((
                    Err(io::Error::new(io::ErrorKind::Interrupted, "upload cancelled")),
                    st,
                ));
            }

            match fill(&mut st.source, &mut st.buffer).await {
                Ok(0) => {
                    st.drained = true;
                    st.finish();
                    None
                }
                Ok(n) => {
                    st.uploaded += n as u64;
                    st.sent.store(st.uploaded, Ordering::Relaxed);
                    st.report();
                    // the wire stops polling once a known length has been sent
                    if st.length == Some(st.uploaded) {
                        st.finish();
                    }
                    let chunk = Bytes::copy_from_slice(&st.buffer[..n]);
                    Some((Ok(chunk), st))
                }
                Err(e) => {
                    st.drained = true;
                    Some((Err(e), st))
                }
            }
        })
    }

    pub fn into_body(self) -> reqwest::Body {
        reqwest::Body::wrap_stream(self.into_stream())
    }
}

impl ProgressContent<Cursor<Bytes>> {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let length = data.len() as u64;
        Self::new(Cursor::new(data), Some(length))
    }
}

impl ProgressContent<tokio::fs::File> {
    /// Open a local file; its length comes from metadata, not from reading it.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        let length = file.metadata().await.ok().map(|m| m.len());
        Ok(Self::new(file, length))
    }
}

struct UploadCursor<R> {
    source: R,
    buffer: Vec<u8>,
    length: Option<u64>,
    control: TransferControl,
    sent: Arc<AtomicU64>,
    gate: StateGate,
    uploaded: u64,
    started: bool,
    drained: bool,
}

impl<R> UploadCursor<R> {
    fn report(&self) {
        if let Some(observer) = self.control.progress_observer() {
            if let Some(pct) = self.length.and_then(|len| percentage(self.uploaded, len)) {
                observer.on_progress(pct);
            }
        }
        self.gate.advance(&self.control, UploadState::InProgress);
    }

    fn finish(&self) {
        self.gate.advance(&self.control, UploadState::PendingResponse);
    }
}

/// Read until `buf` is full or the source is exhausted.
async fn fill<R: AsyncRead + Unpin>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
