//! Command-line interface for reverse-challenge.

use reverse_challenge_core::DifficultyLevel;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Reverse Challenge - record a phrase, play it backwards, imitate it.
#[derive(Parser, Debug)]
#[command(name = "reverse-challenge")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// One game action.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// Record from the default microphone until Ctrl+C or the time limit
    Record {
        /// Output WAV (defaults to a new file in the recordings directory)
        output: Option<PathBuf>,
        /// Auto-stop after this many milliseconds (0 = no limit)
        #[arg(long)]
        max_ms: Option<u64>,
        /// Also write a reversed copy of the recording here
        #[arg(long)]
        reverse: Option<PathBuf>,
    },

    /// Play a WAV file until it ends or Ctrl+C
    Play {
        /// WAV file to play
        path: PathBuf,
    },

    /// Write a time-reversed copy of a WAV file
    Reverse {
        /// Source WAV (16 kHz mono PCM16)
        input: PathBuf,
        /// Destination WAV
        output: PathBuf,
    },

    /// Score an attempt's phonemes against a target's
    Score {
        /// Target phonemes, e.g. "D L R OW"
        #[arg(long)]
        target: String,
        /// Attempt phonemes, e.g. "D AE R"
        #[arg(long)]
        attempt: String,
        /// Duration of the target clip in milliseconds
        #[arg(long)]
        target_ms: u64,
        /// Duration of the attempt in milliseconds
        #[arg(long)]
        attempt_ms: u64,
        /// easy, normal or hard (defaults to the configured level)
        #[arg(long)]
        difficulty: Option<DifficultyLevel>,
    },

    /// List the difficulty levels and their scoring rules
    Profiles,
}
