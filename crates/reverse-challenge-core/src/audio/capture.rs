use crate::{
    CoreError, CoreResult,
    audio::{
        device::{FrameReceiver, MicrophoneSource},
        resampler::StreamResampler,
        wav::{self, SAMPLE_RATE},
    },
    session::{
        CaptureEvent, EventReceiver, RecordingResult, events::EVENT_CHANNEL_CAPACITY,
    },
};

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::{
    sync::{Mutex, broadcast, mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Fraction of a limit at which the one-time `Warning` is raised.
pub const WARNING_FRACTION: f64 = 0.85;

/// Hard ceiling on PCM payload per session (~5.5 minutes at 16kHz mono).
pub const MAX_PAYLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Payloads shorter than this (100ms) are discarded on stop.
pub const MIN_PAYLOAD_BYTES: u64 = 3_200;

pub(crate) const COUNTDOWN_TICK: Duration = Duration::from_millis(50);
pub(crate) const SIZE_GUARD_INTERVAL: Duration = Duration::from_secs(1);

/// Where a session stands relative to one of its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LimitStatus {
    Within,
    Approaching,
    Reached,
}

pub(crate) fn limit_status(used: f64, limit: f64) -> LimitStatus {
    if limit <= 0.0 || used >= limit {
        LimitStatus::Reached
    } else if used >= limit * WARNING_FRACTION {
        LimitStatus::Approaching
    } else {
        LimitStatus::Within
    }
}

/// Per-session latches guaranteeing at most one `Warning` and exactly one
/// `Stop`, whichever task trips them first.
pub(crate) struct LimitGuard {
    warned: AtomicBool,
    stopped: AtomicBool,
    events: broadcast::Sender<CaptureEvent>,
}

impl LimitGuard {
    pub(crate) fn new(events: broadcast::Sender<CaptureEvent>) -> Self {
        Self {
            warned: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            events,
        }
    }

    pub(crate) fn observe(&self, status: LimitStatus) {
        match status {
            LimitStatus::Within => {}
            LimitStatus::Approaching => self.warn(),
            LimitStatus::Reached => self.stop(),
        }
    }

    fn warn(&self) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        if self
            .warned
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("Recording approaching limit");
            // No subscribers is fine; the send never blocks.
            let _ = self.events.send(CaptureEvent::Warning);
        }
    }

    pub(crate) fn stop(&self) {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("Recording limit reached");
            let _ = self.events.send(CaptureEvent::Stop);
        }
    }
}

/// Peak absolute magnitude of a buffer, normalized to [0, 1].
pub(crate) fn peak_amplitude(buffer: &[f32]) -> f32 {
    buffer
        .iter()
        .map(|s| s.abs())
        .filter(|s| s.is_finite())
        .fold(0.0f32, f32::max)
        .min(1.0)
}

/// Averages interleaved frames down to one channel.
pub(crate) fn downmix(buffer: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return buffer.to_vec();
    }
    buffer
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

pub(crate) fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Read-only views of the capture session for the UI.
struct CaptureState {
    is_recording: watch::Sender<bool>,
    amplitude: watch::Sender<f32>,
    countdown_progress: watch::Sender<f32>,
    current_path: watch::Sender<Option<PathBuf>>,
}

impl CaptureState {
    fn new() -> Self {
        Self {
            is_recording: watch::Sender::new(false),
            amplitude: watch::Sender::new(0.0),
            countdown_progress: watch::Sender::new(1.0),
            current_path: watch::Sender::new(None),
        }
    }

    fn reset(&self) {
        self.is_recording.send_replace(false);
        self.amplitude.send_replace(0.0);
        self.countdown_progress.send_replace(1.0);
        self.current_path.send_replace(None);
    }
}

struct ActiveRecording {
    session_id: Uuid,
    path: PathBuf,
    writer: JoinHandle<CoreResult<u64>>,
    countdown: Option<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
}

struct CaptureSession {
    /// Lent to a blocking task for the duration of each device call.
    microphone: Option<Box<dyn MicrophoneSource>>,
    active: Option<ActiveRecording>,
    destroyed: bool,
    max_payload_bytes: u64,
}

/// Thread-safe recording session streaming microphone input to a WAV file.
///
/// `start` and `stop` are serialized by a per-instance lock. While recording,
/// a blocking streaming task appends PCM to the output file and publishes
/// amplitude; an optional countdown task publishes progress and raises
/// limit events. `stop` waits for the streaming task to drain before the
/// header is written, so the payload is never truncated.
pub struct AudioCapture {
    session: Mutex<CaptureSession>,
    state: Arc<CaptureState>,
    events: broadcast::Sender<CaptureEvent>,
}

impl AudioCapture {
    /// Creates a capture session that owns `microphone`.
    pub fn new(microphone: impl MicrophoneSource + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: Mutex::new(CaptureSession {
                microphone: Some(Box::new(microphone)),
                active: None,
                destroyed: false,
                max_payload_bytes: MAX_PAYLOAD_BYTES,
            }),
            state: Arc::new(CaptureState::new()),
            events,
        }
    }

    /// Lowers the payload ceiling from [`MAX_PAYLOAD_BYTES`].
    pub fn with_max_payload_bytes(mut self, bytes: u64) -> Self {
        self.session.get_mut().max_payload_bytes = bytes.min(MAX_PAYLOAD_BYTES);
        self
    }

    /// Subscribes to limit events. Only events raised after subscribing are seen.
    pub fn events(&self) -> EventReceiver {
        EventReceiver::new(self.events.subscribe())
    }

    /// Whether a session is in progress.
    pub fn is_recording(&self) -> watch::Receiver<bool> {
        self.state.is_recording.subscribe()
    }

    /// Peak level of the most recent buffer, in [0, 1].
    pub fn amplitude(&self) -> watch::Receiver<f32> {
        self.state.amplitude.subscribe()
    }

    /// Remaining share of the maximum duration, from 1.0 down to 0.0.
    pub fn countdown_progress(&self) -> watch::Receiver<f32> {
        self.state.countdown_progress.subscribe()
    }

    /// File currently being written.
    pub fn current_path(&self) -> watch::Receiver<Option<PathBuf>> {
        self.state.current_path.subscribe()
    }

    /// Starts recording into `output`. A no-op while already recording.
    ///
    /// On failure every resource acquired so far is released and the session
    /// stays idle, so the call can be retried immediately.
    #[instrument(skip(self, output), fields(output = ?output.as_ref()))]
    pub async fn start(
        &self,
        output: impl AsRef<Path>,
        max_duration: Option<Duration>,
    ) -> CoreResult<()> {
        let mut session = self.session.lock().await;

        if session.destroyed {
            return Err(CoreError::DeviceInit {
                reason: "Capture session already destroyed".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if session.active.is_some() {
            debug!("Already recording, start ignored");
            return Ok(());
        }

        let path = output.as_ref().to_path_buf();
        let session_id = Uuid::new_v4();

        let file = File::create(&path).map_err(|source| CoreError::Write {
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let opened = Self::on_device(&mut session, move |mic| mic.open(frames_tx)).await;
        let format = match opened {
            Ok(format) => format,
            Err(e) => {
                error!(session_id = %session_id, error = ?e, "Microphone unavailable");
                drop(file);
                Self::release_device(&mut session).await;
                remove_quietly(&path);
                self.state.reset();
                return Err(e);
            }
        };

        let resampler = if format.sample_rate != SAMPLE_RATE {
            match StreamResampler::new(format.sample_rate, SAMPLE_RATE) {
                Ok(r) => Some(r),
                Err(e) => {
                    error!(session_id = %session_id, error = ?e, "Resampler unavailable");
                    drop(file);
                    Self::release_device(&mut session).await;
                    remove_quietly(&path);
                    self.state.reset();
                    return Err(e);
                }
            }
        } else {
            None
        };

        let guard = Arc::new(LimitGuard::new(self.events.clone()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let writer = StreamingWriter {
            sink: BufWriter::new(file),
            resampler,
            channels: format.channels,
            payload_bytes: 0,
            max_payload_bytes: session.max_payload_bytes,
            state: Arc::clone(&self.state),
            guard: Arc::clone(&guard),
            cancelled: Arc::clone(&cancelled),
            last_size_check: std::time::Instant::now(),
        };
        let writer = tokio::task::spawn_blocking(move || writer.run(frames_rx));

        let countdown = max_duration.map(|max| {
            let state = Arc::clone(&self.state);
            let guard = Arc::clone(&guard);
            tokio::spawn(run_countdown(max, guard, state))
        });

        self.state.amplitude.send_replace(0.0);
        self.state.countdown_progress.send_replace(1.0);
        self.state.current_path.send_replace(Some(path.clone()));
        self.state.is_recording.send_replace(true);

        info!(
            session_id = %session_id,
            device_rate = format.sample_rate,
            channels = format.channels,
            max_duration_ms = max_duration.map(|d| d.as_millis() as u64),
            "Recording started"
        );

        session.active = Some(ActiveRecording {
            session_id,
            path,
            writer,
            countdown,
            cancelled,
        });

        Ok(())
    }

    /// Stops recording and finalizes the WAV.
    ///
    /// Waits until every buffered sample is on disk, then writes the header
    /// off the async runtime. Returns an empty result when idle, when the
    /// payload is shorter than [`MIN_PAYLOAD_BYTES`], or on any failure.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> RecordingResult {
        let mut session = self.session.lock().await;

        let Some(mut active) = session.active.take() else {
            debug!("Not recording, stop ignored");
            return RecordingResult::empty();
        };

        Self::release_device(&mut session).await;
        finish_countdown(active.countdown.take()).await;

        let drained = match active.writer.await {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(e)) => {
                error!(session_id = %active.session_id, error = ?e, "Streaming task failed");
                None
            }
            Err(e) => {
                error!(session_id = %active.session_id, error = ?e, "Streaming task panicked");
                None
            }
        };

        self.state.reset();

        let Some(payload_bytes) = drained else {
            remove_quietly(&active.path);
            return RecordingResult::empty();
        };

        if payload_bytes < MIN_PAYLOAD_BYTES {
            info!(
                session_id = %active.session_id,
                payload_bytes,
                "Recording too short, discarded"
            );
            remove_quietly(&active.path);
            return RecordingResult::empty();
        }

        let path = active.path.clone();
        let finalized =
            tokio::task::spawn_blocking(move || wav::finalize_wav(&path, SAMPLE_RATE)).await;

        match finalized {
            Ok(Ok(payload_len)) => {
                let duration_ms = wav::payload_duration_ms(payload_len, SAMPLE_RATE);
                info!(
                    session_id = %active.session_id,
                    path = ?active.path,
                    payload_len,
                    duration_ms,
                    "Recording stopped"
                );
                RecordingResult {
                    file: Some(active.path),
                    transcription: None,
                    duration_ms,
                }
            }
            Ok(Err(e)) => {
                error!(session_id = %active.session_id, error = ?e, "Finalize failed");
                remove_quietly(&active.path);
                RecordingResult::empty()
            }
            Err(e) => {
                error!(session_id = %active.session_id, error = ?e, "Finalize task panicked");
                remove_quietly(&active.path);
                RecordingResult::empty()
            }
        }
    }

    /// Abandons any session in progress and releases the device.
    ///
    /// The partial file is deleted. Both background tasks are finished
    /// before this returns.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) {
        let mut session = self.session.lock().await;
        self.cancel_session(&mut session).await;
    }

    /// Like [`cleanup`](Self::cleanup), and refuses any further `start`.
    #[instrument(skip(self))]
    pub async fn destroy(&self) {
        let mut session = self.session.lock().await;
        self.cancel_session(&mut session).await;
        session.destroyed = true;
        info!("Capture destroyed");
    }

    async fn cancel_session(&self, session: &mut CaptureSession) {
        let mut active = session.active.take();

        if let Some(active) = active.as_mut() {
            active.cancelled.store(true, Ordering::Release);
            finish_countdown(active.countdown.take()).await;
        }

        Self::release_device(session).await;

        if let Some(active) = active {
            // Device closed means the frame channel is closed; the writer exits.
            if let Err(e) = active.writer.await {
                warn!(error = ?e, "Streaming task ended abnormally during cleanup");
            }
            remove_quietly(&active.path);
            info!(session_id = %active.session_id, "Recording discarded");
        }

        self.state.reset();
    }

    async fn release_device(session: &mut CaptureSession) {
        if let Err(e) = Self::on_device(session, |mic| mic.close()).await {
            warn!(error = ?e, "Microphone release failed, ignoring");
        }
    }

    /// Runs a blocking device call off the async runtime, then takes the
    /// device back. A call that panics loses the device for good.
    async fn on_device<T, F>(session: &mut CaptureSession, call: F) -> CoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Box<dyn MicrophoneSource>) -> CoreResult<T> + Send + 'static,
    {
        let Some(mut microphone) = session.microphone.take() else {
            return Err(CoreError::DeviceInit {
                reason: "Microphone lost after a failed device call".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let joined = tokio::task::spawn_blocking(move || {
            let result = call(&mut microphone);
            (microphone, result)
        })
        .await;

        match joined {
            Ok((microphone, result)) => {
                session.microphone = Some(microphone);
                result
            }
            Err(e) => Err(CoreError::DeviceInit {
                reason: format!("Microphone call panicked: {}", e),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        let session = self.session.get_mut();
        if let Some(active) = session.active.take() {
            active.cancelled.store(true, Ordering::Release);
            if let Some(countdown) = &active.countdown {
                countdown.abort();
            }
            if let Some(microphone) = session.microphone.as_mut()
                && let Err(e) = microphone.close()
            {
                warn!(error = ?e, "Microphone release failed on drop");
            }
            remove_quietly(&active.path);
            warn!(session_id = %active.session_id, "Capture dropped while recording");
        }
    }
}

/// Aborts the countdown and waits until it can no longer publish.
async fn finish_countdown(countdown: Option<JoinHandle<()>>) {
    let Some(countdown) = countdown else {
        return;
    };
    countdown.abort();
    match countdown.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!(error = ?e, "Countdown task ended abnormally"),
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = ?path, "Removed partial recording"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?path, error = ?e, "Failed to remove partial recording"),
    }
}

async fn run_countdown(max: Duration, guard: Arc<LimitGuard>, state: Arc<CaptureState>) {
    let started = Instant::now();
    let limit = max.as_secs_f64();

    let mut ticker = tokio::time::interval(COUNTDOWN_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let elapsed = started.elapsed().as_secs_f64();
        let status = limit_status(elapsed, limit);

        if status == LimitStatus::Reached {
            state.countdown_progress.send_replace(0.0);
            guard.stop();
            break;
        }

        let remaining = (1.0 - elapsed / limit).clamp(0.0, 1.0) as f32;
        state.countdown_progress.send_replace(remaining);
        guard.observe(status);
    }

    debug!("Countdown finished");
}

struct StreamingWriter {
    sink: BufWriter<File>,
    resampler: Option<StreamResampler>,
    channels: u16,
    payload_bytes: u64,
    max_payload_bytes: u64,
    state: Arc<CaptureState>,
    guard: Arc<LimitGuard>,
    cancelled: Arc<AtomicBool>,
    last_size_check: std::time::Instant,
}

impl StreamingWriter {
    /// Drains `frames` until every sender is gone. Returns the payload length.
    fn run(mut self, mut frames: FrameReceiver) -> CoreResult<u64> {
        let result = self.drain(&mut frames);

        if let Err(e) = &result {
            error!(error = ?e, "Capture write failed, requesting stop");
            // Let the consumer know it has to stop; the device keeps running until then.
            self.guard.stop();
        }

        result
    }

    fn drain(&mut self, frames: &mut FrameReceiver) -> CoreResult<u64> {
        while let Some(buffer) = frames.blocking_recv() {
            if self.cancelled.load(Ordering::Acquire) {
                debug!("Streaming task cancelled");
                return Ok(self.payload_bytes);
            }

            self.state.amplitude.send_replace(peak_amplitude(&buffer));

            let mono = downmix(&buffer, self.channels);
            let samples = match self.resampler.as_mut() {
                Some(resampler) => resampler.push(&mono)?,
                None => mono,
            };
            self.write_samples(&samples)?;
            self.check_size();
        }

        if let Some(resampler) = self.resampler.as_mut() {
            let tail = resampler.finish()?;
            self.write_samples(&tail)?;
        }

        self.sink.flush().map_err(|source| CoreError::Write {
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;
        self.sink
            .get_ref()
            .sync_all()
            .map_err(|source| CoreError::Write {
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!(payload_bytes = self.payload_bytes, "Streaming task drained");

        Ok(self.payload_bytes)
    }

    fn write_samples(&mut self, samples: &[f32]) -> CoreResult<()> {
        for &sample in samples {
            self.sink
                .write_all(&to_pcm16(sample).to_le_bytes())
                .map_err(|source| CoreError::Write {
                    source,
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }
        self.payload_bytes += samples.len() as u64 * wav::BYTES_PER_SAMPLE;
        Ok(())
    }

    fn check_size(&mut self) {
        if self.last_size_check.elapsed() < SIZE_GUARD_INTERVAL {
            return;
        }
        self.last_size_check = std::time::Instant::now();
        self.guard.observe(limit_status(
            self.payload_bytes as f64,
            self.max_payload_bytes as f64,
        ));
    }
}
