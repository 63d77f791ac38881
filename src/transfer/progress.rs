use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one upload. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UploadState {
    PendingUpload,
    InProgress,
    PendingResponse,
    Complete,
}

impl UploadState {
    fn rank(self) -> u8 {
        self as u8 + 1
    }
}

/// Receives transfer progress as a percentage in `[0, 100]`.
///
/// Called inline from the transfer, so implementations should return quickly.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, percent: f32);

    fn on_state(&self, _state: UploadState) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(f32) + Send + Sync,
{
    fn on_progress(&self, percent: f32) {
        self(percent)
    }
}

/// Everything a channel observer forwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferEvent {
    Progress(f32),
    State(UploadState),
}

struct ChannelObserver {
    tx: mpsc::UnboundedSender<TransferEvent>,
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, percent: f32) {
        // a dropped receiver just means nobody is listening anymore
        let _ = self.tx.send(TransferEvent::Progress(percent));
    }

    fn on_state(&self, state: UploadState) {
        let _ = self.tx.send(TransferEvent::State(state));
    }
}

/// Observer that forwards progress and state changes into a channel.
pub fn channel_observer() -> (
    Arc<dyn ProgressObserver>,
    mpsc::UnboundedReceiver<TransferEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelObserver { tx }), rx)
}

/// `transferred / total * 100`, capped at 100. `None` when `total` is zero.
pub fn percentage(transferred: u64, total: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    let pct = transferred as f64 / total as f64 * 100.0;
    Some(pct.min(100.0) as f32)
}

/// Per-transfer observer and cancellation token.
#[derive(Clone, Default)]
pub struct TransferControl {
    observer: Option<Arc<dyn ProgressObserver>>,
    cancel: CancellationToken,
}

impl TransferControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Shorthand for a closure observer.
    pub fn on_progress<F>(self, f: F) -> Self
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        self.observer(Arc::new(f))
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn progress_observer(&self) -> Option<&Arc<dyn ProgressObserver>> {
        self.observer.as_ref()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn notify_state(&self, state: UploadState) {
        if let Some(observer) = &self.observer {
            observer.on_state(state);
        }
    }
}

/// Forward-only state emission for one upload.
///
/// Shared by the body stream and the request sending it, so whichever side
/// gets there first emits a state and the other is a no-op. `InProgress` may
/// repeat; nothing may go backwards.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateGate {
    reached: Arc<AtomicU8>,
}

impl StateGate {
    pub(crate) fn advance(&self, control: &TransferControl, state: UploadState) {
        let rank = state.rank();
        let prev = self.reached.fetch_max(rank, Ordering::AcqRel);
        if rank > prev || (state == UploadState::InProgress && prev == rank) {
            control.notify_state(state);
        }
    }
}

impl fmt::Debug for TransferControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferControl")
            .field("observer", &self.observer.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
