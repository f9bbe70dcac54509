//! Runs one CLI command against the core library.

use crate::{AppError, AppResult, Command, config::Config};

use reverse_challenge_core::{
    AudioCapture, AudioPlayback, CpalMicrophone, CpalPlayer, DifficultyConfig, DifficultyLevel,
    Phoneme, PhonemeScorer, RecordingSession, ScoringResult, parse_phonemes, reverse_wav,
};

use std::{
    fmt::Write as _,
    fs,
    panic::Location,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use error_location::ErrorLocation;
use tokio::sync::oneshot;
use tracing::{info, instrument, warn};

/// Command dispatcher holding the loaded configuration.
pub struct App {
    config: Config,
}

impl App {
    /// Creates an app bound to `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes `command`, printing results to stdout.
    pub async fn run(&self, command: Command) -> AppResult<()> {
        match command {
            Command::Record {
                output,
                max_ms,
                reverse,
            } => self.record(output, max_ms, reverse).await,
            Command::Play { path } => self.play(&path).await,
            Command::Reverse { input, output } => {
                let samples = reverse_file(input, output.clone()).await?;
                println!("Reversed {} samples into {}", samples, output.display());
                Ok(())
            }
            Command::Score {
                target,
                attempt,
                target_ms,
                attempt_ms,
                difficulty,
            } => {
                let level = difficulty.unwrap_or(self.config.game.difficulty);
                let target = parse_phonemes(&target);
                let result = score(&target, &parse_phonemes(&attempt), target_ms, attempt_ms, level)?;
                print!("{}", render_score(&target, &result, level));
                Ok(())
            }
            Command::Profiles => {
                print!("{}", render_profiles(DifficultyConfig::standard()));
                Ok(())
            }
        }
    }

    #[instrument(skip(self))]
    async fn record(
        &self,
        output: Option<PathBuf>,
        max_ms: Option<u64>,
        reverse: Option<PathBuf>,
    ) -> AppResult<()> {
        let output = match output {
            Some(path) => path,
            None => self.default_recording_path()?,
        };
        let max_duration = match max_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => self.config.recording.max_duration(),
        };

        let capture = AudioCapture::new(CpalMicrophone::new());
        let session = RecordingSession::new(&capture, max_duration);

        match max_duration {
            Some(limit) => println!("Recording for up to {} ms, Ctrl+C to stop early", limit.as_millis()),
            None => println!("Recording, Ctrl+C to stop"),
        }

        let recorded = session.record_until_limit(&output, ctrl_c()).await;
        capture.cleanup().await;
        let result = recorded?;

        let Some(file) = result.file else {
            warn!("Recording discarded");
            println!("Nothing was recorded");
            return Ok(());
        };
        println!("Saved {} ({} ms)", file.display(), result.duration_ms);

        if let Some(reversed) = reverse {
            reverse_file(file, reversed.clone()).await?;
            println!("Reversed copy saved to {}", reversed.display());
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn play(&self, path: &Path) -> AppResult<()> {
        let playback = AudioPlayback::new(CpalPlayer::new());
        let (done_tx, done_rx) = oneshot::channel();

        playback
            .play(path, move || {
                let _ = done_tx.send(());
            })
            .await?;
        println!("Playing {}, Ctrl+C to stop", path.display());

        tokio::select! {
            _ = done_rx => info!("Playback finished"),
            _ = ctrl_c() => {
                info!("Playback interrupted");
                playback.stop().await;
            }
        }

        Ok(())
    }

    #[track_caller]
    fn default_recording_path(&self) -> AppResult<PathBuf> {
        let dir = self.config.recordings_dir()?;
        fs::create_dir_all(&dir)?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Ok(dir.join(format!("take-{}.wav", stamp)))
    }
}

/// Scores two phoneme sequences the way the game does.
#[track_caller]
pub(crate) fn score(
    target: &[Phoneme],
    attempt: &[Phoneme],
    target_ms: u64,
    attempt_ms: u64,
    level: DifficultyLevel,
) -> AppResult<ScoringResult> {
    if target.is_empty() {
        return Err(AppError::Usage {
            reason: "target must contain at least one phoneme".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    Ok(PhonemeScorer::new().score(target, attempt, target_ms, attempt_ms, level.profile()))
}

/// Score summary with one `+`/`-` mark per target phoneme.
pub(crate) fn render_score(
    target: &[Phoneme],
    result: &ScoringResult,
    level: DifficultyLevel,
) -> String {
    let marks: Vec<String> = target
        .iter()
        .zip(&result.phoneme_matches)
        .map(|(phoneme, matched)| format!("{}{}", phoneme, if *matched { '+' } else { '-' }))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "Score: {} ({})", result.score, level);
    let _ = writeln!(out, "Phonemes: {}", marks.join(" "));
    let _ = writeln!(
        out,
        "Overlap: {:.3}  Duration ratio: {:.3}  Timing bonus: {:.3}",
        result.overlap_ratio, result.duration_ratio, result.duration_bonus
    );
    out
}

/// One line per difficulty level.
pub(crate) fn render_profiles(config: &DifficultyConfig) -> String {
    let mut out = String::new();
    for (level, profile) in config.iter() {
        let (low, high) = profile.window_percent();
        let _ = writeln!(
            out,
            "{:<7} {:<8} window {}-{}%  width {:.2}  bonus {:.2}",
            level,
            format!("{:?}", profile.match_mode).to_uppercase(),
            low,
            high,
            profile.gaussian_width,
            profile.bonus_weight
        );
    }
    out
}

async fn reverse_file(input: PathBuf, output: PathBuf) -> AppResult<usize> {
    tokio::task::spawn_blocking(move || reverse_wav(&input, &output))
        .await
        .map_err(|e| AppError::Io {
            source: std::io::Error::other(e),
            location: ErrorLocation::from(Location::caller()),
        })?
        .map_err(AppError::from)
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = ?e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}
