use crate::{CoreError, CoreResult, audio::device::PlayerBackend};

use std::{
    panic::Location,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
        mpsc as std_mpsc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use cpal::{
    Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use hound::{SampleFormat, WavReader};
use tracing::{debug, error, info, instrument, warn};

/// Decoded clip plus playhead, shared with the output callback.
#[derive(Default)]
pub(crate) struct PlayerBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    /// Fractional index into `samples`; advances by `sample_rate / device_rate`.
    position: f64,
    playing: bool,
}

impl PlayerBuffer {
    /// A stopped clip at the start of `samples`.
    pub(crate) fn loaded(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            position: 0.0,
            playing: false,
        }
    }

    fn finished(&self) -> bool {
        self.position >= self.samples.len() as f64
    }

    /// True once a loaded clip has played through. An empty clip is
    /// complete as soon as it is loaded; an unloaded buffer never is.
    pub(crate) fn complete(&self) -> bool {
        self.sample_rate != 0 && self.finished()
    }
}

struct OutputThread {
    stop_tx: std_mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Default system output device via CPAL.
///
/// Clips are decoded to mono `f32` with `hound`, then rendered on an output
/// stream that lives on its own thread. Mono is copied to every device
/// channel; rate mismatches are bridged by stepping the playhead.
#[derive(Default)]
pub struct CpalPlayer {
    buffer: Arc<Mutex<PlayerBuffer>>,
    output: Option<OutputThread>,
}

impl CpalPlayer {
    /// Creates a player with no device opened yet.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_buffer(&self) -> std::sync::MutexGuard<'_, PlayerBuffer> {
        self.buffer.lock().unwrap_or_else(|e| {
            error!("Player buffer lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    #[track_caller]
    fn ensure_output(&mut self) -> CoreResult<()> {
        if self.output.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let (ready_tx, ready_rx) = std_mpsc::channel::<CoreResult<()>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("player-stream".to_string())
            .spawn(move || {
                let stream = match build_output_stream(buffer) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Output stream dropped");
            })
            .map_err(|e| CoreError::DeviceInit {
                reason: format!("Failed to spawn player thread: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.output = Some(OutputThread { stop_tx, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CoreError::DeviceInit {
                    reason: "Player thread exited before reporting".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }
}

impl PlayerBackend for CpalPlayer {
    #[track_caller]
    #[instrument(skip(self))]
    fn open(&mut self, path: &Path) -> CoreResult<Duration> {
        let (samples, sample_rate) = decode_mono(path)?;
        let duration = Duration::from_secs_f64(samples.len() as f64 / f64::from(sample_rate));

        {
            let mut buffer = self.lock_buffer();
            *buffer = PlayerBuffer::loaded(samples, sample_rate);
        }

        self.ensure_output()?;

        info!(path = ?path, duration_ms = duration.as_millis() as u64, "Clip loaded");

        Ok(duration)
    }

    fn start(&mut self) -> CoreResult<()> {
        self.ensure_output()?;
        self.lock_buffer().playing = true;
        Ok(())
    }

    fn pause(&mut self) -> CoreResult<()> {
        self.lock_buffer().playing = false;
        Ok(())
    }

    fn position(&self) -> Duration {
        let buffer = self.lock_buffer();
        if buffer.sample_rate == 0 {
            return Duration::ZERO;
        }
        let played = buffer.position.min(buffer.samples.len() as f64);
        Duration::from_secs_f64(played / f64::from(buffer.sample_rate))
    }

    fn duration(&self) -> Duration {
        let buffer = self.lock_buffer();
        if buffer.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(buffer.samples.len() as f64 / f64::from(buffer.sample_rate))
    }

    fn is_finished(&self) -> bool {
        self.lock_buffer().complete()
    }

    fn release(&mut self) {
        if let Some(output) = self.output.take() {
            let _ = output.stop_tx.send(());
            if output.handle.join().is_err() {
                warn!("Player thread panicked during release");
            }
        }
        *self.lock_buffer() = PlayerBuffer::default();
    }
}

impl Drop for CpalPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

#[track_caller]
fn decode_mono(path: &Path) -> CoreResult<(Vec<f32>, u32)> {
    let reader = WavReader::open(path).map_err(|e| CoreError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: format!("Failed to open WAV: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(CoreError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: "sample rate is zero".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Result<Vec<f32>, _> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect(),
        SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect()
        }
    };

    let interleaved = interleaved.map_err(|e| CoreError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: format!("Failed to read samples: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let mono = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}

#[track_caller]
fn build_output_stream(buffer: Arc<Mutex<PlayerBuffer>>) -> CoreResult<Stream> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or(CoreError::DeviceInit {
            reason: "No output device found".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let supported = device
        .default_output_config()
        .map_err(|e| CoreError::DeviceInit {
            reason: format!("Failed to get output config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let config: StreamConfig = supported.into();
    let device_rate = f64::from(config.sample_rate.max(1));
    let channels = usize::from(config.channels.max(1));

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut buffer = buffer.lock().unwrap_or_else(|e| e.into_inner());
                let step = f64::from(buffer.sample_rate) / device_rate;

                for frame in data.chunks_mut(channels) {
                    let sample = if buffer.playing && !buffer.finished() {
                        let s = buffer.samples[buffer.position as usize];
                        buffer.position += step;
                        s
                    } else {
                        0.0
                    };
                    frame.fill(sample);
                }

                if buffer.finished() {
                    buffer.playing = false;
                }
            },
            |err| {
                error!("Audio output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| CoreError::DeviceInit {
            reason: format!("Failed to build output stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    stream.play().map_err(|e| CoreError::DeviceInit {
        reason: format!("Failed to start output stream: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(stream)
}

/// Lifecycle counters for a [`MemoryPlayer`].
#[derive(Debug, Default)]
pub struct PlayerProbe {
    opens: AtomicUsize,
    releases: AtomicUsize,
}

impl PlayerProbe {
    /// Successful `open` calls.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::Acquire)
    }

    /// `release` calls made while a clip was loaded.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }
}

/// Wall-clock driven fake player.
///
/// Reads only the WAV header to learn the clip duration, then advances the
/// playhead in real time (scaled by `speed`) while started.
pub struct MemoryPlayer {
    duration: Duration,
    accumulated: Duration,
    started_at: Option<Instant>,
    speed: f64,
    loaded: bool,
    unavailable: bool,
    probe: Arc<PlayerProbe>,
}

impl Default for MemoryPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlayer {
    /// Player running at real time.
    pub fn new() -> Self {
        Self {
            duration: Duration::ZERO,
            accumulated: Duration::ZERO,
            started_at: None,
            speed: 1.0,
            loaded: false,
            unavailable: false,
            probe: Arc::new(PlayerProbe::default()),
        }
    }

    /// Player whose `open` always fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    /// Advance the playhead `speed` times faster than real time.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed.max(f64::EPSILON);
        self
    }

    /// Shared counters for asserting device lifecycle from tests.
    pub fn probe(&self) -> Arc<PlayerProbe> {
        Arc::clone(&self.probe)
    }

    fn elapsed(&self) -> Duration {
        let running = self
            .started_at
            .map(|at| at.elapsed().mul_f64(self.speed))
            .unwrap_or(Duration::ZERO);
        (self.accumulated + running).min(self.duration)
    }
}

impl PlayerBackend for MemoryPlayer {
    #[track_caller]
    fn open(&mut self, path: &Path) -> CoreResult<Duration> {
        if self.unavailable {
            return Err(CoreError::DeviceInit {
                reason: "Memory player configured as unavailable".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let reader = WavReader::open(path).map_err(|e| CoreError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!("Failed to open WAV: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(CoreError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: "sample rate is zero".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.duration =
            Duration::from_secs_f64(f64::from(reader.duration()) / f64::from(spec.sample_rate));
        self.accumulated = Duration::ZERO;
        self.started_at = None;
        self.loaded = true;
        self.probe.opens.fetch_add(1, Ordering::AcqRel);

        Ok(self.duration)
    }

    fn start(&mut self) -> CoreResult<()> {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) -> CoreResult<()> {
        self.accumulated = self.elapsed();
        self.started_at = None;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.elapsed()
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn is_finished(&self) -> bool {
        self.loaded && self.elapsed() >= self.duration
    }

    fn release(&mut self) {
        if self.loaded {
            self.probe.releases.fetch_add(1, Ordering::AcqRel);
        }
        self.loaded = false;
        self.duration = Duration::ZERO;
        self.accumulated = Duration::ZERO;
        self.started_at = None;
    }
}
