use reverse_challenge_core::DifficultyLevel;

use serde::{Deserialize, Serialize};

/// Game rules configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Difficulty used when a command does not name one.
    #[serde(default)]
    pub difficulty: DifficultyLevel,
}
