//! Reverse Challenge Core Library
//!
//! Voice capture, playback, reversal and phoneme scoring for the reverse
//! challenge game, built on CPAL, Rubato and Hound.
//!
//! # Example
//!
//! ```no_run
//! use reverse_challenge_core::{
//!     AudioCapture, CpalMicrophone, DifficultyLevel, PhonemeScorer, RecordingSession,
//!     parse_phonemes,
//! };
//!
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> reverse_challenge_core::CoreResult<()> {
//!     let capture = AudioCapture::new(CpalMicrophone::new());
//!     let session = RecordingSession::new(&capture, Some(Duration::from_secs(5)));
//!     let recording = session
//!         .record_until_limit("take.wav", std::future::pending())
//!         .await?;
//!     println!("Recorded {:?} ({} ms)", recording.file, recording.duration_ms);
//!
//!     let result = PhonemeScorer::new().score(
//!         &parse_phonemes("D L R OW"),
//!         &parse_phonemes("D AE R"),
//!         2000,
//!         3000,
//!         DifficultyLevel::Normal.profile(),
//!     );
//!     println!("Score: {}", result.score);
//!     Ok(())
//! }
//! ```

mod audio;
mod error;
mod scoring;
mod session;

pub use {
    audio::{
        AudioCapture, AudioPlayback, BITS_PER_SAMPLE, CHANNELS, CompletionCallback, CpalMicrophone,
        CpalPlayer, FrameReceiver, FrameSender, HEADER_LEN, InputFormat, MAX_PAYLOAD_BYTES,
        MIN_PAYLOAD_BYTES, MemoryMicrophone, MemoryPlayer, MicrophoneProbe, MicrophoneSource,
        PlayerBackend, PlayerProbe, SAMPLE_RATE, WARNING_FRACTION, payload_duration_ms,
        reverse_wav, wav_header, write_pcm16_wav,
    },
    error::{CoreError, Result as CoreResult},
    scoring::{
        CLASS_SIMILARITY, CLOSE_SIMILARITY, DifficultyConfig, DifficultyLevel, DifficultyProfile,
        EXACT_SIMILARITY, MATCH_THRESHOLD, MatchMode, Phoneme, PhonemeScorer, PhonemeSequence,
        ScoringResult, WordPhonemes, duration_bonus, parse_phonemes, phoneme_similarity,
        validate_partition,
    },
    session::{
        AttemptPipeline, CaptureEvent, Challenge, EventReceiver, Phonemizer, PlayerAttempt,
        RecordingResult, RecordingSession, Transcript, VoiceSimilarity,
    },
};
