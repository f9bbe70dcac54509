use crate::config::default_max_duration_ms;

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Recording configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Auto-stop limit in milliseconds (0 = record until stopped).
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,
    /// Where recordings without an explicit path go (None = platform data dir).
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
}

impl RecordingConfig {
    /// The configured limit, `None` when unlimited.
    pub fn max_duration(&self) -> Option<Duration> {
        (self.max_duration_ms > 0).then(|| Duration::from_millis(self.max_duration_ms))
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: default_max_duration_ms(),
            recordings_dir: None,
        }
    }
}
