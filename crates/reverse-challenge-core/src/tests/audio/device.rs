use crate::{
    AudioCapture, AudioPlayback, CpalMicrophone, CpalPlayer, RecordingSession, SAMPLE_RATE,
    tests::{wait_until, write_ramp_wav},
};

use std::{
    future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use hound::WavReader;

/// WHAT: The default input device records a 16kHz mono WAV
/// WHY: Verifies the cpal stream thread, resampler and writer together
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
#[allow(clippy::unwrap_used)]
async fn given_default_microphone_when_recording_half_second_then_wav_written() {
    // Given: The system's default microphone
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mic.wav");
    let capture = AudioCapture::new(CpalMicrophone::new());
    let session = RecordingSession::new(&capture, Some(Duration::from_millis(500)));

    // When: Recording until the limit
    let result = session
        .record_until_limit(&path, future::pending::<()>())
        .await
        .unwrap();
    capture.cleanup().await;

    // Then: A canonical file at the storage format
    assert_eq!(result.file.as_deref(), Some(path.as_path()));
    let reader = WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    assert_eq!(reader.spec().channels, 1);
}

/// WHAT: The default output device plays a clip to completion
/// WHY: Verifies decode, output stream and end-of-clip detection
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
#[allow(clippy::unwrap_used)]
async fn given_short_clip_when_playing_on_default_device_then_completion_fires() {
    // Given: A 200ms clip
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ramp.wav");
    write_ramp_wav(&path, 3_200);
    let playback = AudioPlayback::new(CpalPlayer::new());
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);

    // When: Playing it
    playback
        .play(&path, move || flag.store(true, Ordering::SeqCst))
        .await
        .unwrap();

    // Then: Completion runs and the player resets
    let playing = playback.is_playing();
    assert!(wait_until(|| done.load(Ordering::SeqCst) && !*playing.borrow()).await);
}

/// WHAT: A header-only WAV completes on the default output device
/// WHY: The device player must not wait for samples that never arrive
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
#[allow(clippy::unwrap_used)]
async fn given_zero_sample_clip_when_playing_on_default_device_then_completion_fires() {
    // Given: A WAV with no samples
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    write_ramp_wav(&path, 0);
    let playback = AudioPlayback::new(CpalPlayer::new());
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);

    // When: Playing it
    playback
        .play(&path, move || flag.store(true, Ordering::SeqCst))
        .await
        .unwrap();

    // Then: Completion runs on the first poll
    let playing = playback.is_playing();
    assert!(wait_until(|| done.load(Ordering::SeqCst) && !*playing.borrow()).await);
}
