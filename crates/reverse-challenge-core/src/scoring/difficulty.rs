use crate::{CoreError, CoreResult};

use std::{fmt, panic::Location, str::FromStr};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// How target and attempt phonemes are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchMode {
    /// Order-independent, with partial credit for similar sounds.
    Fuzzy,
    /// Order-independent multiset overlap (Jaccard).
    Exact,
    /// Longest common subsequence against the target.
    Ordered,
}

/// Player-selectable difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    /// Fuzzy matching, generous timing.
    Easy,
    /// Exact matching.
    #[default]
    Normal,
    /// Ordered matching, tight timing.
    Hard,
}

impl DifficultyLevel {
    /// Every level, easiest first.
    pub const ALL: [DifficultyLevel; 3] = [Self::Easy, Self::Normal, Self::Hard];

    /// Lower-case name used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }

    /// Profile for this level from the standard registry.
    pub fn profile(self) -> &'static DifficultyProfile {
        DifficultyConfig::standard().profile(self)
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyLevel {
    type Err = CoreError;

    #[track_caller]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            other => Err(CoreError::InvalidInput {
                reason: format!("unknown difficulty '{}', expected easy, normal or hard", other),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// Matching and timing parameters bound to one difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// Phoneme comparison strategy.
    pub match_mode: MatchMode,
    /// Lower bound of the advertised duration window, as a ratio of the target.
    pub duration_window_min: f64,
    /// Upper bound of the advertised duration window, as a ratio of the target.
    pub duration_window_max: f64,
    /// Denominator of the Gaussian timing bonus; smaller is stricter.
    pub gaussian_width: f64,
    /// Share of the score awarded for timing, in [0, 1].
    pub bonus_weight: f64,
}

impl DifficultyProfile {
    /// Fuzzy matching, 50-150% window.
    pub const EASY: Self = Self {
        match_mode: MatchMode::Fuzzy,
        duration_window_min: 0.5,
        duration_window_max: 1.5,
        gaussian_width: 0.5,
        bonus_weight: 0.20,
    };

    /// Exact matching, 70-130% window.
    pub const NORMAL: Self = Self {
        match_mode: MatchMode::Exact,
        duration_window_min: 0.7,
        duration_window_max: 1.3,
        gaussian_width: 0.2,
        bonus_weight: 0.15,
    };

    /// Ordered matching, 85-115% window.
    pub const HARD: Self = Self {
        match_mode: MatchMode::Ordered,
        duration_window_min: 0.85,
        duration_window_max: 1.15,
        gaussian_width: 0.1,
        bonus_weight: 0.10,
    };

    /// The advertised duration window as whole percentages, for display.
    ///
    /// The window is explanatory only; scoring applies the continuous bonus
    /// with no cutoff.
    pub fn window_percent(&self) -> (u32, u32) {
        (
            (self.duration_window_min * 100.0).round() as u32,
            (self.duration_window_max * 100.0).round() as u32,
        )
    }

    /// Rejects parameters the scorer cannot use.
    #[track_caller]
    pub fn validate(&self) -> CoreResult<()> {
        let reason = if !(self.gaussian_width.is_finite() && self.gaussian_width > 0.0) {
            Some(format!("gaussian_width must be > 0, got {}", self.gaussian_width))
        } else if !(0.0..=1.0).contains(&self.bonus_weight) {
            Some(format!("bonus_weight must be within [0, 1], got {}", self.bonus_weight))
        } else if !(self.duration_window_min >= 0.0
            && self.duration_window_min <= self.duration_window_max)
        {
            Some(format!(
                "duration window {}..{} is empty or negative",
                self.duration_window_min, self.duration_window_max
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CoreError::InvalidInput {
                reason,
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Ok(()),
        }
    }
}

/// Immutable registry of one profile per [`DifficultyLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    easy: DifficultyProfile,
    normal: DifficultyProfile,
    hard: DifficultyProfile,
}

static STANDARD: DifficultyConfig = DifficultyConfig {
    easy: DifficultyProfile::EASY,
    normal: DifficultyProfile::NORMAL,
    hard: DifficultyProfile::HARD,
};

impl DifficultyConfig {
    /// The built-in registry shared by the whole process.
    pub fn standard() -> &'static DifficultyConfig {
        &STANDARD
    }

    /// Builds a custom registry after validating every profile.
    #[track_caller]
    pub fn new(
        easy: DifficultyProfile,
        normal: DifficultyProfile,
        hard: DifficultyProfile,
    ) -> CoreResult<Self> {
        easy.validate()?;
        normal.validate()?;
        hard.validate()?;
        Ok(Self { easy, normal, hard })
    }

    /// Profile bound to `level`.
    pub fn profile(&self, level: DifficultyLevel) -> &DifficultyProfile {
        match level {
            DifficultyLevel::Easy => &self.easy,
            DifficultyLevel::Normal => &self.normal,
            DifficultyLevel::Hard => &self.hard,
        }
    }

    /// Levels and profiles, easiest first.
    pub fn iter(&self) -> impl Iterator<Item = (DifficultyLevel, &DifficultyProfile)> {
        DifficultyLevel::ALL
            .into_iter()
            .map(move |level| (level, self.profile(level)))
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        STANDARD
    }
}
