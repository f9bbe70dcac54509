//! Configuration management for reverse-challenge.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{GameConfig, LoggingConfig, RecordingConfig},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "reverse-challenge";
const APPLICATION: &str = "Reverse-Challenge";

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Recording limits and output location.
    #[serde(default)]
    pub recording: RecordingConfig,
    /// Game rules.
    #[serde(default)]
    pub game: GameConfig,
    /// Log filtering and format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the platform config dir, creating default if not found.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if it is missing.
    #[track_caller]
    #[instrument]
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            info!(config_path = ?path, "No config found, creating default");
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(|e| AppError::Config {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::Config {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Save configuration to `path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
            debug!(config_dir = ?parent, "Created config directory");
        }

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::Config {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::Config {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::Config {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::Config {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, path).map_err(|e| AppError::Config {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Directory for recordings made without an explicit output path.
    #[track_caller]
    pub fn recordings_dir(&self) -> AppResult<PathBuf> {
        if let Some(dir) = &self.recording.recordings_dir {
            return Ok(dir.clone());
        }
        Ok(Self::project_dirs()?.data_dir().join("recordings"))
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| AppError::Config {
            reason: "Failed to get project directories".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
