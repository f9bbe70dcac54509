//! Reverse Challenge: record a phrase, hear it backwards, and score how well
//! players imitate the reversed sound.

mod app;
mod cli;
mod config;
mod error;

pub(crate) use {
    app::App,
    cli::{Cli, Command},
    error::{AppError, Result as AppResult},
};

use crate::config::{Config, LoggingConfig};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application entry point.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(&logging);

    let config = match loaded {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!(command = ?cli.command, "Starting reverse-challenge");

    if let Err(e) = App::new(config).run(cli.command).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
