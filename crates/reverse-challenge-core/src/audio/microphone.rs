use crate::{
    CoreError, CoreResult,
    audio::device::{FrameSender, InputFormat, MicrophoneSource},
};

use std::{
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc as std_mpsc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use cpal::{
    Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};

/// Default system microphone via CPAL.
///
/// `cpal::Stream` is not `Send`, so the stream is built on and owned by a
/// dedicated thread that parks until [`MicrophoneSource::close`] is called.
#[derive(Default)]
pub struct CpalMicrophone {
    stream_thread: Option<StreamThread>,
}

struct StreamThread {
    stop_tx: std_mpsc::Sender<()>,
    handle: JoinHandle<()>,
    /// Set before the stream is dropped so a callback already in flight
    /// stops forwarding buffers.
    shutdown: Arc<AtomicBool>,
}

impl CpalMicrophone {
    /// Creates an unopened microphone.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MicrophoneSource for CpalMicrophone {
    #[track_caller]
    #[instrument(skip(self, frames))]
    fn open(&mut self, frames: FrameSender) -> CoreResult<InputFormat> {
        if self.stream_thread.is_some() {
            self.close()?;
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let (ready_tx, ready_rx) = std_mpsc::channel::<CoreResult<InputFormat>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("mic-stream".to_string())
            .spawn(move || {
                let stream = match build_input_stream(frames, thread_shutdown) {
                    Ok((stream, format)) => {
                        let _ = ready_tx.send(Ok(format));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Either an explicit stop or the owner being dropped ends the stream.
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Microphone stream dropped");
            })
            .map_err(|e| CoreError::DeviceInit {
                reason: format!("Failed to spawn microphone thread: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let reported = ready_rx.recv().map_err(|_| CoreError::DeviceInit {
            reason: "Microphone thread exited before reporting".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });

        match reported {
            Ok(Ok(format)) => {
                self.stream_thread = Some(StreamThread {
                    stop_tx,
                    handle,
                    shutdown,
                });
                info!(
                    sample_rate = format.sample_rate,
                    channels = format.channels,
                    "Microphone opened"
                );
                Ok(format)
            }
            Ok(Err(e)) | Err(e) => {
                let _ = handle.join();
                Err(e)
            }
        }
    }

    #[track_caller]
    fn close(&mut self) -> CoreResult<()> {
        let Some(stream_thread) = self.stream_thread.take() else {
            return Ok(());
        };

        stream_thread.shutdown.store(true, Ordering::Release);
        let _ = stream_thread.stop_tx.send(());

        stream_thread
            .handle
            .join()
            .map_err(|_| CoreError::DeviceInit {
                reason: "Microphone thread panicked".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("Microphone closed");

        Ok(())
    }
}

impl Drop for CpalMicrophone {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = ?e, "Failed to close microphone on drop");
        }
    }
}

#[track_caller]
fn build_input_stream(
    frames: FrameSender,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<(Stream, InputFormat)> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or(CoreError::DeviceInit {
            reason: "No microphone found".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let supported = device
        .default_input_config()
        .map_err(|e| CoreError::DeviceInit {
            reason: format!("Failed to get config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let config: StreamConfig = supported.into();
    let format = InputFormat {
        sample_rate: config.sample_rate,
        channels: config.channels,
    };

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if shutdown.load(Ordering::Acquire) {
                    return;
                }
                // Receiver gone means the session already stopped listening.
                let _ = frames.send(data.to_vec());
            },
            |err| {
                error!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| CoreError::DeviceInit {
            reason: format!("Failed to build stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    stream.play().map_err(|e| CoreError::DeviceInit {
        reason: format!("Failed to start stream: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok((stream, format))
}

/// Open/close counters shared between a [`MemoryMicrophone`] and its probe.
#[derive(Debug, Default)]
pub struct MicrophoneProbe {
    opens: AtomicUsize,
    closes: AtomicUsize,
    delivered: AtomicUsize,
    open: AtomicBool,
}

impl MicrophoneProbe {
    /// Number of successful `open` calls.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::Acquire)
    }

    /// Number of `close` calls that released an open device.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::Acquire)
    }

    /// Buffers handed to the capture channel since creation.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Acquire)
    }

    /// Whether the device is currently held open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// In-memory microphone that replays scripted buffers.
///
/// Buffers are delivered from a feeder thread, optionally paced by
/// `frame_interval`, and optionally looped until the device is closed.
pub struct MemoryMicrophone {
    format: InputFormat,
    script: Arc<Vec<Vec<f32>>>,
    frame_interval: Option<Duration>,
    looping: bool,
    unavailable: bool,
    probe: Arc<MicrophoneProbe>,
    feeder: Option<(Arc<AtomicBool>, JoinHandle<()>)>,
}

impl MemoryMicrophone {
    /// Replays `script` once, then stays open and silent until closed.
    pub fn new(format: InputFormat, script: Vec<Vec<f32>>) -> Self {
        Self {
            format,
            script: Arc::new(script),
            frame_interval: None,
            looping: false,
            unavailable: false,
            probe: Arc::new(MicrophoneProbe::default()),
            feeder: None,
        }
    }

    /// Repeats `frame` every `interval` until closed, like a live device.
    pub fn continuous(format: InputFormat, frame: Vec<f32>, interval: Duration) -> Self {
        let mut mic = Self::new(format, vec![frame]);
        mic.frame_interval = Some(interval);
        mic.looping = true;
        mic
    }

    /// A microphone whose `open` always fails.
    pub fn unavailable() -> Self {
        let mut mic = Self::new(
            InputFormat {
                sample_rate: crate::audio::SAMPLE_RATE,
                channels: 1,
            },
            Vec::new(),
        );
        mic.unavailable = true;
        mic
    }

    /// Pace scripted buffers `interval` apart.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Shared counters for asserting device lifecycle from tests.
    pub fn probe(&self) -> Arc<MicrophoneProbe> {
        Arc::clone(&self.probe)
    }
}

impl MicrophoneSource for MemoryMicrophone {
    #[track_caller]
    fn open(&mut self, frames: FrameSender) -> CoreResult<InputFormat> {
        if self.unavailable {
            return Err(CoreError::DeviceInit {
                reason: "Memory microphone configured as unavailable".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.close()?;

        let stop = Arc::new(AtomicBool::new(false));
        let feeder_stop = Arc::clone(&stop);
        let script = Arc::clone(&self.script);
        let interval = self.frame_interval;
        let looping = self.looping && !script.is_empty();
        let probe = Arc::clone(&self.probe);

        let handle = thread::Builder::new()
            .name("memory-mic".to_string())
            .spawn(move || {
                'feed: loop {
                    for frame in script.iter() {
                        if feeder_stop.load(Ordering::Acquire) {
                            break 'feed;
                        }
                        if frames.send(frame.clone()).is_err() {
                            break 'feed;
                        }
                        probe.delivered.fetch_add(1, Ordering::AcqRel);
                        thread::sleep(interval.unwrap_or(Duration::ZERO));
                    }
                    if !looping {
                        break;
                    }
                }
                while !feeder_stop.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(2));
                }
            })
            .map_err(|e| CoreError::DeviceInit {
                reason: format!("Failed to spawn feeder thread: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.feeder = Some((stop, handle));
        self.probe.opens.fetch_add(1, Ordering::AcqRel);
        self.probe.open.store(true, Ordering::Release);

        Ok(self.format)
    }

    #[track_caller]
    fn close(&mut self) -> CoreResult<()> {
        let Some((stop, handle)) = self.feeder.take() else {
            return Ok(());
        };

        stop.store(true, Ordering::Release);
        handle.join().map_err(|_| CoreError::DeviceInit {
            reason: "Feeder thread panicked".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.probe.closes.fetch_add(1, Ordering::AcqRel);
        self.probe.open.store(false, Ordering::Release);

        Ok(())
    }
}

impl Drop for MemoryMicrophone {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
