mod difficulty;
mod phoneme;
pub(crate) mod scorer;
pub(crate) mod similarity;

pub use {
    difficulty::{DifficultyConfig, DifficultyLevel, DifficultyProfile, MatchMode},
    phoneme::{Phoneme, PhonemeSequence, WordPhonemes, parse_phonemes, validate_partition},
    scorer::{PhonemeScorer, ScoringResult, duration_bonus},
    similarity::{
        CLASS_SIMILARITY, CLOSE_SIMILARITY, EXACT_SIMILARITY, MATCH_THRESHOLD, phoneme_similarity,
    },
};
