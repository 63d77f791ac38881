//! Buffered, cancellable copy used on the download path.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Error, Result};

pub const DEFAULT_DOWNLOAD_BUFFER_SIZE: usize = 81920;

#[derive(Debug, Clone, Copy)]
pub struct StreamCopier {
    buffer_size: usize,
}

impl Default for StreamCopier {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_DOWNLOAD_BUFFER_SIZE,
        }
    }
}

impl StreamCopier {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Copy `source` into `destination`, calling `on_bytes` with the running
    /// total after each chunk is written.
    ///
    /// Cancellation is checked between chunks and while waiting on a read.
    /// Bytes already written stay in `destination`.
    pub async fn copy<R, W, F>(
        &self,
        source: &mut R,
        destination: &mut W,
        mut on_bytes: Option<F>,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
        F: FnMut(u64),
    {
        let mut buffer = vec![0u8; self.buffer_size];
        let mut total: u64 = 0;

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(bytes_transferred = total, "download cancelled");
                    return Err(Error::Cancelled { bytes_transferred: total });
                }
                read = source.read(&mut buffer) => read?,
            };
            if read == 0 {
                break;
            }

            destination.write_all(&buffer[..read]).await?;
            total += read as u64;
            if let Some(on_bytes) = on_bytes.as_mut() {
                on_bytes(total);
            }
        }

        destination.flush().await?;
        Ok(total)
    }
}
