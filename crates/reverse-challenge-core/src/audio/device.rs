//! Device seams for capture and playback.
//!
//! Real hardware sits behind [`MicrophoneSource`] and [`PlayerBackend`] so the
//! session state machines can be driven deterministically by in-memory fakes.

use crate::CoreResult;

use std::{path::Path, time::Duration};

use tokio::sync::mpsc;

/// Sender half handed to a microphone; each message is one interleaved
/// `f32` buffer as delivered by the device.
pub type FrameSender = mpsc::UnboundedSender<Vec<f32>>;

/// Receiver half drained by the capture streaming task.
pub type FrameReceiver = mpsc::UnboundedReceiver<Vec<f32>>;

/// Native format of an opened input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFormat {
    /// Frames per second delivered by the device.
    pub sample_rate: u32,
    /// Interleaved channels per frame.
    pub channels: u16,
}

/// A microphone that streams buffers into a channel while open.
pub trait MicrophoneSource: Send {
    /// Opens the device and starts delivering buffers to `frames`.
    ///
    /// Implementations must drop every clone of `frames` once `close` returns
    /// so the consumer observes the end of the stream.
    fn open(&mut self, frames: FrameSender) -> CoreResult<InputFormat>;

    /// Stops the device and releases its handle. Closing an already closed
    /// source is a no-op.
    fn close(&mut self) -> CoreResult<()>;
}

/// A player device that renders one file at a time.
pub trait PlayerBackend: Send {
    /// Loads `path`, replacing anything previously loaded. Returns the total
    /// duration of the clip.
    fn open(&mut self, path: &Path) -> CoreResult<Duration>;

    /// Starts or resumes rendering from the current position.
    fn start(&mut self) -> CoreResult<()>;

    /// Halts rendering, keeping the current position.
    fn pause(&mut self) -> CoreResult<()>;

    /// Position of the playhead.
    fn position(&self) -> Duration;

    /// Duration of the loaded clip, zero when nothing is loaded.
    fn duration(&self) -> Duration;

    /// True once the playhead has reached the end of the clip.
    fn is_finished(&self) -> bool;

    /// Releases the device handle and unloads the clip. Safe to call twice.
    fn release(&mut self);
}
