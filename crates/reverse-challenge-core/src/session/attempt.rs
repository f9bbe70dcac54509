use crate::scoring::ScoringResult;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pitch and timbre metrics from an external voice analyzer.
///
/// Stored next to the score; never used to compute it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSimilarity {
    /// Pitch contour similarity in [0, 1].
    pub pitch: f64,
    /// Spectral timbre similarity in [0, 1].
    pub timbre: f64,
    /// Analyzer's combined figure in [0, 1].
    pub overall: f64,
}

/// One player's scored attempt at a challenge.
///
/// The computed [`ScoringResult`] is fixed at construction. A human override
/// is kept in its own field so the original score stays auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAttempt {
    /// Unique attempt id.
    pub id: Uuid,
    /// Display name of the player.
    pub player: String,
    /// Finalized recording the attempt was scored from.
    pub recording: PathBuf,
    /// Transcription of the attempt, if the phonemizer produced one.
    pub transcription: Option<String>,
    result: ScoringResult,
    override_score: Option<u8>,
    voice_similarity: Option<VoiceSimilarity>,
}

impl PlayerAttempt {
    /// Records a freshly scored attempt.
    pub fn new(player: impl Into<String>, recording: PathBuf, result: ScoringResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            player: player.into(),
            recording,
            transcription: None,
            result,
            override_score: None,
            voice_similarity: None,
        }
    }

    /// Attaches the attempt's transcription.
    pub fn with_transcription(mut self, transcription: impl Into<String>) -> Self {
        self.transcription = Some(transcription.into());
        self
    }

    /// The score as computed, regardless of any override.
    pub fn result(&self) -> &ScoringResult {
        &self.result
    }

    /// Human override, if one was applied.
    pub fn override_score(&self) -> Option<u8> {
        self.override_score
    }

    /// Stores a manual score (clamped to 100) alongside the computed one.
    pub fn apply_override(&mut self, score: u8) {
        self.override_score = Some(score.min(100));
    }

    /// Drops the manual score, falling back to the computed one.
    pub fn clear_override(&mut self) {
        self.override_score = None;
    }

    /// The override when present, otherwise the computed score.
    pub fn effective_score(&self) -> u8 {
        self.override_score.unwrap_or(self.result.score)
    }

    /// Voice analyzer metrics, if attached.
    pub fn voice_similarity(&self) -> Option<VoiceSimilarity> {
        self.voice_similarity
    }

    /// Stores analyzer output; replaces any earlier metrics.
    pub fn attach_voice_similarity(&mut self, similarity: VoiceSimilarity) {
        self.voice_similarity = Some(similarity);
    }
}
