mod attempt;
pub(crate) mod events;
mod pipeline;
mod recorder;
mod recording;

pub use {
    attempt::{PlayerAttempt, VoiceSimilarity},
    events::{CaptureEvent, EventReceiver},
    pipeline::{AttemptPipeline, Challenge, Phonemizer, Transcript},
    recorder::RecordingSession,
    recording::RecordingResult,
};
