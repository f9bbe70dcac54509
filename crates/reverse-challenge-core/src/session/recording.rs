use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Outcome of one `AudioCapture::stop` call.
///
/// An empty result (`file == None`) means nothing playable was produced:
/// the session was idle, too short, or failed while writing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingResult {
    /// Finalized WAV, owned by the caller from here on.
    pub file: Option<PathBuf>,
    /// Caller-supplied transcription. Capture always leaves this `None`;
    /// [`AttemptPipeline`](crate::AttemptPipeline) keeps its transcripts on
    /// `Challenge` and `PlayerAttempt` instead.
    pub transcription: Option<String>,
    /// Audio length derived from the payload byte count.
    pub duration_ms: u64,
}

impl RecordingResult {
    /// Result carrying no recording.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no file was produced.
    pub fn is_empty(&self) -> bool {
        self.file.is_none()
    }
}
