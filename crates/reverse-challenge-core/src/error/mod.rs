use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

/// Capture, playback and scoring errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Microphone or player device could not be opened.
    #[error("Device initialization failed: {reason} {location}")]
    DeviceInit {
        /// Description of the device failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// I/O failure while streaming captured samples to disk.
    #[error("Failed to write captured audio: {source} {location}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Header write, payload copy or rename failed while finalizing a WAV.
    #[error("Failed to finalize WAV at {path:?}: {source} {location}")]
    Finalize {
        /// File being finalized.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Malformed phoneme data handed to the scorer.
    #[error("Invalid scoring input: {reason} {location}")]
    InvalidInput {
        /// Description of the violated invariant.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio file is not in a format this crate can play or reverse.
    #[error("Unsupported audio format in {path:?}: {reason} {location}")]
    UnsupportedFormat {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The external phonemizer failed or its worker task died.
    #[error("Phonemization failed: {reason} {location}")]
    Phonemizer {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Sample rate conversion failed.
    #[error("Resampling error: {reason} {location}")]
    Resampling {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
