#[allow(clippy::module_inception)]
mod config;
mod game_config;
mod logging_config;
mod recording_config;

pub(crate) use {
    config::Config, game_config::GameConfig, logging_config::LoggingConfig,
    recording_config::RecordingConfig,
};

pub(crate) const DEFAULT_MAX_DURATION_MS: u64 = 10_000;
pub(crate) const DEFAULT_LOG_FILTER: &str = "reverse_challenge=info,reverse_challenge_core=info";

pub(crate) fn default_max_duration_ms() -> u64 {
    DEFAULT_MAX_DURATION_MS
}

pub(crate) fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
