//! Streaming file transfer: progress-observable upload bodies and a
//! cancellable, progress-reporting download copier.

pub mod content;
pub mod copier;
pub mod progress;

pub use content::{ProgressContent, DEFAULT_UPLOAD_BUFFER_SIZE};
pub use copier::{StreamCopier, DEFAULT_DOWNLOAD_BUFFER_SIZE};
pub use progress::{
    channel_observer, percentage, ProgressObserver, TransferControl, TransferEvent, UploadState,
};
pub(crate) use progress::StateGate;
