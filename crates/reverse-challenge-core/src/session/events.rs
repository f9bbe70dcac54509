use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::debug;

/// One slot: a consumer that falls behind loses the older event, never the latest.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 1;

/// Limit notifications raised during a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Recording is approaching its duration or size limit.
    Warning,
    /// Limit reached; the consumer must call `AudioCapture::stop`.
    Stop,
}

/// Consumer end of the capture event channel.
///
/// Lagging is absorbed here: skipped events are logged and the next retained
/// event is returned, so order is preserved and the producer never waits.
pub struct EventReceiver {
    inner: broadcast::Receiver<CaptureEvent>,
}

impl EventReceiver {
    pub(crate) fn new(inner: broadcast::Receiver<CaptureEvent>) -> Self {
        Self { inner }
    }

    /// Waits for the next event. Returns `None` once the capture is dropped.
    pub async fn recv(&mut self) -> Option<CaptureEvent> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Capture event consumer lagged, oldest events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<CaptureEvent> {
        loop {
            match self.inner.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Capture event consumer lagged, oldest events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
