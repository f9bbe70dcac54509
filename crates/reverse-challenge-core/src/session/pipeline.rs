//! Glue between finalized recordings, the external phonemizer and the scorer.

use crate::{
    CoreError, CoreResult,
    audio::reverse_wav,
    scoring::{
        DifficultyConfig, DifficultyLevel, Phoneme, PhonemeScorer, PhonemeSequence, WordPhonemes,
    },
    session::{PlayerAttempt, RecordingResult},
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    sync::Arc,
};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Raw phonemizer output for one recording.
///
/// `words` is whatever partition the collaborator reported and is not
/// trusted; it is checked against `phonemes` before use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Recognized text.
    pub text: String,
    /// Per-word breakdown, possibly empty.
    pub words: Vec<WordPhonemes>,
    /// Flat phoneme sequence.
    pub phonemes: Vec<Phoneme>,
}

impl Transcript {
    /// Validated view of the phonemes.
    #[track_caller]
    pub fn sequence(&self) -> CoreResult<PhonemeSequence> {
        PhonemeSequence::new(self.words.clone(), self.phonemes.clone())
    }
}

/// Speech-to-phoneme service. Implementations may block.
pub trait Phonemizer: Send + Sync {
    /// Transcribes and phonemizes the WAV at `recording`.
    fn phonemize(&self, recording: &Path) -> CoreResult<Transcript>;
}

/// A reversed clip and the phonemes players are scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Unique challenge id.
    pub id: Uuid,
    /// Recording as captured.
    pub original: PathBuf,
    /// Reversed clip that players imitate.
    pub reversed: PathBuf,
    /// Phonemes of the reversed clip.
    pub target: PhonemeSequence,
    /// Length of the clip; the reference for attempt timing.
    pub duration_ms: u64,
    /// Text the phonemizer heard in the reversed clip.
    pub transcription: String,
}

/// Turns recordings into challenges and scored attempts.
pub struct AttemptPipeline {
    phonemizer: Arc<dyn Phonemizer>,
    scorer: PhonemeScorer,
    difficulty: DifficultyConfig,
}

impl AttemptPipeline {
    /// Pipeline using the standard difficulty registry.
    pub fn new(phonemizer: Arc<dyn Phonemizer>) -> Self {
        Self::with_difficulty(phonemizer, DifficultyConfig::default())
    }

    /// Pipeline using a custom difficulty registry.
    pub fn with_difficulty(phonemizer: Arc<dyn Phonemizer>, difficulty: DifficultyConfig) -> Self {
        Self {
            phonemizer,
            scorer: PhonemeScorer::new(),
            difficulty,
        }
    }

    /// Registry this pipeline scores with.
    pub fn difficulty(&self) -> &DifficultyConfig {
        &self.difficulty
    }

    /// Reverses `recording` into `reversed` and phonemizes the result.
    ///
    /// Fails when the recording is empty, the reversal fails, or the
    /// phonemizer reports a broken word partition for the target.
    #[instrument(skip(self, recording, reversed), fields(reversed = ?reversed.as_ref()))]
    pub async fn prepare_challenge(
        &self,
        recording: &RecordingResult,
        reversed: impl AsRef<Path>,
    ) -> CoreResult<Challenge> {
        let original = require_file(recording)?;
        let reversed = reversed.as_ref().to_path_buf();

        let phonemizer = Arc::clone(&self.phonemizer);
        let (source, destination) = (original.clone(), reversed.clone());
        let transcript = run_blocking(move || {
            reverse_wav(&source, &destination)?;
            phonemizer.phonemize(&destination)
        })
        .await?;

        let target = transcript.sequence()?;

        info!(
            phoneme_count = target.len(),
            duration_ms = recording.duration_ms,
            "Challenge prepared"
        );

        Ok(Challenge {
            id: Uuid::new_v4(),
            original,
            reversed,
            target,
            duration_ms: recording.duration_ms,
            transcription: transcript.text,
        })
    }

    /// Phonemizes `attempt` and scores it against `challenge` at `level`.
    ///
    /// A broken partition in the attempt transcript scores 0 rather than
    /// failing; only a missing file or a phonemizer failure is an error.
    #[instrument(
        skip(self, player, attempt, challenge),
        fields(challenge_id = %challenge.id, level = %level)
    )]
    pub async fn evaluate(
        &self,
        player: impl Into<String>,
        attempt: &RecordingResult,
        challenge: &Challenge,
        level: DifficultyLevel,
    ) -> CoreResult<PlayerAttempt> {
        let recording = require_file(attempt)?;

        let phonemizer = Arc::clone(&self.phonemizer);
        let path = recording.clone();
        let transcript = run_blocking(move || phonemizer.phonemize(&path)).await?;

        let result = self.scorer.score_partitioned(
            challenge.target.words(),
            challenge.target.phonemes(),
            &transcript.words,
            &transcript.phonemes,
            challenge.duration_ms,
            attempt.duration_ms,
            self.difficulty.profile(level),
        );

        let player = player.into();
        info!(player = %player, score = result.score, "Attempt evaluated");

        let mut scored = PlayerAttempt::new(player, recording, result);
        if !transcript.text.is_empty() {
            scored = scored.with_transcription(transcript.text);
        }
        Ok(scored)
    }
}

#[track_caller]
fn require_file(recording: &RecordingResult) -> CoreResult<PathBuf> {
    recording.file.clone().ok_or_else(|| CoreError::InvalidInput {
        reason: "recording produced no file".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

async fn run_blocking<T, F>(work: F) -> CoreResult<T>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = ?e, "Phonemizer task ended abnormally");
            Err(CoreError::Phonemizer {
                reason: format!("worker task failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }
}
