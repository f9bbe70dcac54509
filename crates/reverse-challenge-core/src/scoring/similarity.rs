//! Articulatory similarity between ARPAbet phonemes.

use crate::scoring::Phoneme;

/// Credit for identical phonemes.
pub const EXACT_SIMILARITY: f64 = 1.0;
/// Credit for sounds that are easily confused (voicing pairs, neighbouring vowels).
pub const CLOSE_SIMILARITY: f64 = 0.7;
/// Credit for sounds sharing only a manner class (both vowels, both stops...).
pub const CLASS_SIMILARITY: f64 = 0.3;
/// Pair similarity at or above which a target phoneme is shown as matched.
pub const MATCH_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhoneClass {
    Vowel,
    Stop,
    Fricative,
    Affricate,
    Nasal,
    Liquid,
    Glide,
}

const CLOSE_PAIRS: &[(&str, &str)] = &[
    // vowels
    ("AA", "AO"),
    ("AA", "AH"),
    ("AO", "AH"),
    ("AE", "EH"),
    ("EH", "EY"),
    ("EH", "IH"),
    ("IH", "IY"),
    ("UH", "UW"),
    ("OW", "UW"),
    ("OW", "AO"),
    ("AY", "EY"),
    ("AW", "OW"),
    ("OY", "OW"),
    ("ER", "AH"),
    // voicing pairs
    ("P", "B"),
    ("T", "D"),
    ("K", "G"),
    ("F", "V"),
    ("TH", "DH"),
    ("S", "Z"),
    ("SH", "ZH"),
    ("CH", "JH"),
    // place neighbours
    ("TH", "F"),
    ("DH", "D"),
    ("S", "SH"),
    ("Z", "ZH"),
    ("CH", "SH"),
    ("JH", "ZH"),
    ("M", "N"),
    ("N", "NG"),
    ("L", "R"),
    ("ER", "R"),
    ("W", "UW"),
    ("Y", "IY"),
];

fn class_of(symbol: &str) -> Option<PhoneClass> {
    let class = match symbol {
        "AA" | "AE" | "AH" | "AO" | "AW" | "AY" | "EH" | "ER" | "EY" | "IH" | "IY" | "OW"
        | "OY" | "UH" | "UW" => PhoneClass::Vowel,
        "P" | "B" | "T" | "D" | "K" | "G" => PhoneClass::Stop,
        "F" | "V" | "TH" | "DH" | "S" | "Z" | "SH" | "ZH" | "HH" => PhoneClass::Fricative,
        "CH" | "JH" => PhoneClass::Affricate,
        "M" | "N" | "NG" => PhoneClass::Nasal,
        "L" | "R" => PhoneClass::Liquid,
        "W" | "Y" => PhoneClass::Glide,
        _ => return None,
    };
    Some(class)
}

/// Similarity of two phonemes in [0, 1]. Symmetric; unknown symbols only
/// match themselves.
pub fn phoneme_similarity(a: &Phoneme, b: &Phoneme) -> f64 {
    let (a, b) = (a.as_str(), b.as_str());

    if a == b {
        return EXACT_SIMILARITY;
    }

    if CLOSE_PAIRS
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    {
        return CLOSE_SIMILARITY;
    }

    match (class_of(a), class_of(b)) {
        (Some(x), Some(y)) if x == y => CLASS_SIMILARITY,
        _ => 0.0,
    }
}
