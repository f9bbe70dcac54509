use crate::{CoreError, CoreResult};

use std::{fmt, panic::Location};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// One ARPAbet-style speech sound, e.g. `D` or `AE`.
///
/// Symbols are normalized on construction: surrounding whitespace is
/// trimmed, letters are upper-cased and trailing stress digits are dropped,
/// so `ow1` and `OW` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Phoneme(String);

impl Phoneme {
    /// Normalizes `symbol` into a phoneme.
    pub fn new(symbol: impl AsRef<str>) -> Self {
        let normalized = symbol
            .as_ref()
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .to_ascii_uppercase();
        Self(normalized)
    }

    /// The normalized symbol.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Phoneme {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl From<String> for Phoneme {
    fn from(symbol: String) -> Self {
        Self::new(symbol)
    }
}

impl From<Phoneme> for String {
    fn from(phoneme: Phoneme) -> Self {
        phoneme.0
    }
}

impl fmt::Display for Phoneme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits whitespace-separated symbols (`"D L R OW1"`) into phonemes.
pub fn parse_phonemes(text: &str) -> Vec<Phoneme> {
    text.split_whitespace()
        .map(Phoneme::new)
        .filter(|p| !p.as_str().is_empty())
        .collect()
}

/// A word and the phonemes it was pronounced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPhonemes {
    /// Orthographic word.
    pub word: String,
    /// Phonemes in pronunciation order.
    pub phonemes: Vec<Phoneme>,
}

impl WordPhonemes {
    /// Builds a word from its text and a whitespace-separated phoneme string.
    pub fn parse(word: impl Into<String>, phonemes: &str) -> Self {
        Self {
            word: word.into(),
            phonemes: parse_phonemes(phonemes),
        }
    }
}

/// Flat phoneme sequence together with its optional per-word partition.
///
/// When `words` is non-empty, concatenating every word's phonemes yields
/// exactly `phonemes`. A sequence built without words carries no partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonemeSequence {
    words: Vec<WordPhonemes>,
    phonemes: Vec<Phoneme>,
}

impl PhonemeSequence {
    /// Pairs a word partition with a flat sequence, rejecting mismatches.
    #[track_caller]
    pub fn new(words: Vec<WordPhonemes>, phonemes: Vec<Phoneme>) -> CoreResult<Self> {
        validate_partition(&words, &phonemes)?;
        Ok(Self { words, phonemes })
    }

    /// Derives the flat sequence from `words`; always valid.
    pub fn from_words(words: Vec<WordPhonemes>) -> Self {
        let phonemes = words
            .iter()
            .flat_map(|w| w.phonemes.iter().cloned())
            .collect();
        Self { words, phonemes }
    }

    /// A sequence with no word breakdown.
    pub fn from_phonemes(phonemes: Vec<Phoneme>) -> Self {
        Self {
            words: Vec::new(),
            phonemes,
        }
    }

    /// Per-word breakdown, empty when unknown.
    pub fn words(&self) -> &[WordPhonemes] {
        &self.words
    }

    /// The flat sequence scored by [`PhonemeScorer`](crate::PhonemeScorer).
    pub fn phonemes(&self) -> &[Phoneme] {
        &self.phonemes
    }

    /// Number of phonemes.
    pub fn len(&self) -> usize {
        self.phonemes.len()
    }

    /// True when there are no phonemes.
    pub fn is_empty(&self) -> bool {
        self.phonemes.is_empty()
    }
}

/// Checks that `words` partitions `phonemes` exactly, in order.
#[track_caller]
pub fn validate_partition(words: &[WordPhonemes], phonemes: &[Phoneme]) -> CoreResult<()> {
    if words.is_empty() {
        return Ok(());
    }

    let covered: usize = words.iter().map(|w| w.phonemes.len()).sum();
    if covered != phonemes.len() {
        return Err(CoreError::InvalidInput {
            reason: format!(
                "word partition covers {} phonemes but sequence has {}",
                covered,
                phonemes.len()
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let concatenated = words.iter().flat_map(|w| w.phonemes.iter());
    if let Some((index, (expected, found))) = phonemes
        .iter()
        .zip(concatenated)
        .enumerate()
        .find(|(_, (flat, word))| flat != word)
    {
        return Err(CoreError::InvalidInput {
            reason: format!(
                "word partition diverges at index {}: sequence has {} but words give {}",
                index, expected, found
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(())
}
