use crate::{
    AudioPlayback, CoreError, MemoryPlayer, SAMPLE_RATE,
    audio::{playback::progress_fraction, player::PlayerBuffer},
    tests::{wait_until, write_ramp_wav},
};

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

// 100ms and 1s clips at 16kHz.
const SHORT_CLIP_SAMPLES: usize = 1_600;
const LONG_CLIP_SAMPLES: usize = 16_000;

fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&count);
    (count, move || {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

/// WHAT: A clip played to its end fires the completion callback once and resets
/// WHY: The UI advances to the next step from this callback
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_short_clip_when_playing_to_end_then_completion_fires_and_state_resets() {
    // Given: A 100ms clip and a real-time fake player
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_ramp_wav(&path, SHORT_CLIP_SAMPLES);
    let player = MemoryPlayer::new();
    let probe = player.probe();
    let playback = AudioPlayback::new(player);
    let is_playing = playback.is_playing();
    let current_path = playback.current_path();
    let (completions, on_completion) = counter();

    // When: Playing through
    playback.play(&path, on_completion).await.unwrap();
    assert!(*is_playing.borrow());
    assert_eq!(current_path.borrow().as_deref(), Some(path.as_path()));
    assert!(wait_until(|| completions.load(Ordering::SeqCst) == 1).await);

    // Then: Player is idle and the device released exactly once
    assert!(!*is_playing.borrow());
    assert!(current_path.borrow().is_none());
    assert_eq!(*playback.progress().borrow(), 0.0);
    assert_eq!(probe.opens(), 1);
    assert_eq!(probe.releases(), 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

/// WHAT: Starting a second clip replaces the first without its callback firing
/// WHY: Only one clip may play at a time
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_clip_playing_when_playing_another_then_first_replaced_silently() {
    // Given: A long clip already playing
    let dir = tempfile::tempdir().unwrap();
    let long = dir.path().join("long.wav");
    let short = dir.path().join("short.wav");
    write_ramp_wav(&long, LONG_CLIP_SAMPLES);
    write_ramp_wav(&short, SHORT_CLIP_SAMPLES);
    let player = MemoryPlayer::new();
    let probe = player.probe();
    let playback = AudioPlayback::new(player);
    let (first_done, first_callback) = counter();
    let (second_done, second_callback) = counter();
    playback.play(&long, first_callback).await.unwrap();

    // When: Playing the short clip over it
    playback.play(&short, second_callback).await.unwrap();
    assert_eq!(playback.current_path().borrow().as_deref(), Some(short.as_path()));
    assert!(wait_until(|| second_done.load(Ordering::SeqCst) == 1).await);

    // Then: Only the second clip completed; both loads were released
    assert_eq!(first_done.load(Ordering::SeqCst), 0);
    assert_eq!(probe.opens(), 2);
    assert_eq!(probe.releases(), 2);
}

/// WHAT: stop() before the end suppresses the completion callback
/// WHY: A user stop must not race a natural completion
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_clip_playing_when_stopping_then_no_completion_and_state_cleared() {
    // Given: A 1s clip playing
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_ramp_wav(&path, LONG_CLIP_SAMPLES);
    let player = MemoryPlayer::new();
    let probe = player.probe();
    let playback = AudioPlayback::new(player);
    let (completions, on_completion) = counter();
    playback.play(&path, on_completion).await.unwrap();

    // When: Stopping early, twice
    tokio::time::sleep(Duration::from_millis(150)).await;
    playback.stop().await;
    playback.stop().await;

    // Then: Idle, released once, and the callback never runs
    assert!(!*playback.is_playing().borrow());
    assert!(playback.current_path().borrow().is_none());
    assert_eq!(*playback.progress().borrow(), 0.0);
    assert_eq!(probe.releases(), 1);

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(completions.load(Ordering::SeqCst), 0);
}

/// WHAT: pause() freezes progress and resume() continues from the same spot
/// WHY: Polling must stop while paused and restart on resume
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_clip_playing_when_pausing_and_resuming_then_position_preserved() {
    // Given: A 1s clip that has played for a bit
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_ramp_wav(&path, LONG_CLIP_SAMPLES);
    let playback = AudioPlayback::new(MemoryPlayer::new());
    let progress = playback.progress();
    let (completions, on_completion) = counter();
    playback.play(&path, on_completion).await.unwrap();
    assert!(wait_until(|| *progress.borrow() > 0.0).await);

    // When: Pausing for 300ms
    playback.pause().await;
    let paused_at = *progress.borrow();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Then: Progress frozen while paused
    assert!(!*playback.is_playing().borrow());
    assert_eq!(*progress.borrow(), paused_at);
    assert_eq!(
        playback.current_path().borrow().as_deref(),
        Some(path.as_path())
    );

    // When: Resuming
    playback.resume().await;

    // Then: Playing again and progress moves past the paused point
    assert!(*playback.is_playing().borrow());
    assert!(wait_until(|| *progress.borrow() > paused_at).await);
    assert!(wait_until(|| completions.load(Ordering::SeqCst) == 1).await);
}

/// WHAT: pause/resume without a loaded clip are no-ops
/// WHY: UI buttons may fire in any state
#[tokio::test]
async fn given_idle_player_when_pausing_or_resuming_then_nothing_happens() {
    // Given: A player with nothing loaded
    let player = MemoryPlayer::new();
    let probe = player.probe();
    let playback = AudioPlayback::new(player);

    // When: Toggling
    playback.pause().await;
    playback.resume().await;

    // Then: Still idle and the device untouched
    assert!(!*playback.is_playing().borrow());
    assert_eq!(probe.opens(), 0);
    assert_eq!(probe.releases(), 0);
}

/// WHAT: A player that cannot open reports DeviceInit and stays idle
/// WHY: Playback failures resolve to a clean stopped state
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unavailable_player_when_playing_then_error_and_idle() {
    // Given: An unavailable player and a valid clip
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_ramp_wav(&path, SHORT_CLIP_SAMPLES);
    let playback = AudioPlayback::new(MemoryPlayer::unavailable());
    let (completions, on_completion) = counter();

    // When: Playing
    let result = playback.play(&path, on_completion).await;

    // Then: Error surfaced, nothing playing, callback dropped
    assert!(matches!(result, Err(CoreError::DeviceInit { .. })));
    assert!(!*playback.is_playing().borrow());
    assert!(playback.current_path().borrow().is_none());
    assert_eq!(completions.load(Ordering::SeqCst), 0);
}

/// WHAT: A file that is not a WAV is rejected as UnsupportedFormat
/// WHY: Corrupt recordings must not wedge the player
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_corrupt_file_when_playing_then_unsupported_format() {
    // Given: Garbage bytes on disk
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.wav");
    std::fs::write(&path, b"not a wav").unwrap();
    let playback = AudioPlayback::new(MemoryPlayer::new());

    // When: Playing
    let result = playback.play(&path, || {}).await;

    // Then: Rejected and idle
    assert!(matches!(result, Err(CoreError::UnsupportedFormat { .. })));
    assert!(!*playback.is_playing().borrow());
}

/// WHAT: Progress is position over duration, clamped to [0, 1]
/// WHY: Zero-length clips must not divide by zero
#[test]
fn given_positions_when_computing_progress_then_fraction_clamped() {
    let second = Duration::from_secs(1);
    assert_eq!(progress_fraction(Duration::ZERO, Duration::ZERO), 0.0);
    assert_eq!(progress_fraction(Duration::from_millis(500), second), 0.5);
    assert_eq!(progress_fraction(Duration::from_secs(3), second), 1.0);
}

/// WHAT: A loaded clip with no samples counts as complete at once
/// WHY: A header-only WAV would otherwise keep the poller waiting forever
#[test]
fn given_loaded_empty_clip_when_checking_completion_then_complete() {
    let empty = PlayerBuffer::loaded(Vec::new(), SAMPLE_RATE);
    assert!(empty.complete());
}

/// WHAT: Nothing loaded is never complete, a fresh clip only once played
/// WHY: Completion must not fire before a clip has been opened or rendered
#[test]
fn given_unloaded_or_fresh_buffer_when_checking_completion_then_not_complete() {
    assert!(!PlayerBuffer::default().complete());
    assert!(!PlayerBuffer::loaded(vec![0.0; 16], SAMPLE_RATE).complete());
}

/// WHAT: Playing a header-only WAV completes and resets the player
/// WHY: Zero-sample recordings reach playback as ordinary files
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_zero_sample_clip_when_playing_then_completion_fires() {
    // Given: A WAV with a header and no samples
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    write_ramp_wav(&path, 0);
    let playback = AudioPlayback::new(MemoryPlayer::new());
    let is_playing = playback.is_playing();
    let (completions, on_completion) = counter();

    // When: Playing it
    playback.play(&path, on_completion).await.unwrap();

    // Then: Completion fires on the first poll and the player is idle
    assert!(wait_until(|| completions.load(Ordering::SeqCst) == 1).await);
    assert!(!*is_playing.borrow());
}
