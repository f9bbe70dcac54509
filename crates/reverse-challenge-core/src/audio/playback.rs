use crate::{CoreResult, audio::device::PlayerBackend};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, instrument};

/// Position polling cadence (~10 Hz).
pub(crate) const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Invoked once when a clip plays through to its end.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

struct PlaybackState {
    is_playing: watch::Sender<bool>,
    progress: watch::Sender<f32>,
    current_path: watch::Sender<Option<PathBuf>>,
}

impl PlaybackState {
    fn reset(&self) {
        self.is_playing.send_replace(false);
        self.progress.send_replace(0.0);
        self.current_path.send_replace(None);
    }
}

struct PlaybackSession {
    backend: Box<dyn PlayerBackend>,
    poller: Option<JoinHandle<()>>,
    on_completion: Option<CompletionCallback>,
    /// Bumped whenever a poller is replaced so a stale one exits on its next tick.
    generation: u64,
    loaded: bool,
    paused: bool,
}

impl PlaybackSession {
    fn cancel_poller(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

struct PlaybackInner {
    session: Mutex<PlaybackSession>,
    state: PlaybackState,
}

/// Single-clip player with progress reporting.
///
/// Every mutating call and the completion path run under one lock, so a
/// user `stop` can never interleave with a natural end of playback.
pub struct AudioPlayback {
    inner: Arc<PlaybackInner>,
}

impl AudioPlayback {
    /// Creates a player that owns `backend`.
    pub fn new(backend: impl PlayerBackend + 'static) -> Self {
        Self {
            inner: Arc::new(PlaybackInner {
                session: Mutex::new(PlaybackSession {
                    backend: Box::new(backend),
                    poller: None,
                    on_completion: None,
                    generation: 0,
                    loaded: false,
                    paused: false,
                }),
                state: PlaybackState {
                    is_playing: watch::Sender::new(false),
                    progress: watch::Sender::new(0.0),
                    current_path: watch::Sender::new(None),
                },
            }),
        }
    }

    /// Whether audio is currently rendering.
    pub fn is_playing(&self) -> watch::Receiver<bool> {
        self.inner.state.is_playing.subscribe()
    }

    /// Playhead as a fraction of the clip, in [0, 1].
    pub fn progress(&self) -> watch::Receiver<f32> {
        self.inner.state.progress.subscribe()
    }

    /// Clip currently loaded.
    pub fn current_path(&self) -> watch::Receiver<Option<PathBuf>> {
        self.inner.state.current_path.subscribe()
    }

    /// Plays `path` from the start, replacing whatever was playing.
    ///
    /// `on_completion` runs after the clip ends naturally; it is dropped
    /// unused if playback is stopped or replaced first. On failure the
    /// player is left stopped and released.
    #[instrument(skip(self, path, on_completion), fields(path = ?path.as_ref()))]
    pub async fn play(
        &self,
        path: impl AsRef<Path>,
        on_completion: impl FnOnce() + Send + 'static,
    ) -> CoreResult<()> {
        let path = path.as_ref().to_path_buf();
        let mut session = self.inner.session.lock().await;

        Self::stop_locked(&mut session, &self.inner.state);

        let started = session
            .backend
            .open(&path)
            .and_then(|_| session.backend.start());
        if let Err(e) = started {
            error!(path = ?path, error = ?e, "Playback failed to start");
            Self::stop_locked(&mut session, &self.inner.state);
            return Err(e);
        }

        session.loaded = true;
        session.paused = false;
        session.on_completion = Some(Box::new(on_completion));
        Self::spawn_poller(&mut session, &self.inner);

        self.inner.state.progress.send_replace(0.0);
        self.inner.state.current_path.send_replace(Some(path.clone()));
        self.inner.state.is_playing.send_replace(true);

        info!(path = ?path, "Playback started");

        Ok(())
    }

    /// Pauses in place. A no-op unless something is playing.
    #[instrument(skip(self))]
    pub async fn pause(&self) {
        let mut session = self.inner.session.lock().await;
        if !session.loaded || session.paused {
            return;
        }

        session.cancel_poller();
        if let Err(e) = session.backend.pause() {
            error!(error = ?e, "Pause failed, stopping playback");
            Self::stop_locked(&mut session, &self.inner.state);
            return;
        }

        session.paused = true;
        self.inner.state.is_playing.send_replace(false);
        debug!("Playback paused");
    }

    /// Resumes from the paused position. A no-op unless paused.
    #[instrument(skip(self))]
    pub async fn resume(&self) {
        let mut session = self.inner.session.lock().await;
        if !session.loaded || !session.paused {
            return;
        }

        if let Err(e) = session.backend.start() {
            error!(error = ?e, "Resume failed, stopping playback");
            Self::stop_locked(&mut session, &self.inner.state);
            return;
        }

        session.paused = false;
        Self::spawn_poller(&mut session, &self.inner);
        self.inner.state.is_playing.send_replace(true);
        debug!("Playback resumed");
    }

    /// Halts playback and releases the device.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let mut session = self.inner.session.lock().await;
        Self::stop_locked(&mut session, &self.inner.state);
    }

    fn stop_locked(session: &mut PlaybackSession, state: &PlaybackState) {
        session.cancel_poller();
        session.on_completion = None;
        if session.loaded {
            session.backend.release();
            info!("Playback stopped");
        }
        session.loaded = false;
        session.paused = false;
        state.reset();
    }

    fn spawn_poller(session: &mut PlaybackSession, inner: &Arc<PlaybackInner>) {
        session.cancel_poller();
        let generation = session.generation;
        session.poller = Some(tokio::spawn(poll_progress(Arc::clone(inner), generation)));
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        // The poller holds its own reference; it must not keep the device alive.
        if let Ok(mut session) = self.inner.session.try_lock() {
            Self::stop_locked(&mut session, &self.inner.state);
        }
    }
}

pub(crate) fn progress_fraction(position: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 0.0;
    }
    (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0) as f32
}

async fn poll_progress(inner: Arc<PlaybackInner>, generation: u64) {
    let mut ticker = tokio::time::interval(PROGRESS_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let completion = {
            let mut session = inner.session.lock().await;
            if session.generation != generation || !session.loaded || session.paused {
                return;
            }

            let progress =
                progress_fraction(session.backend.position(), session.backend.duration());
            inner.state.progress.send_replace(progress);

            if !session.backend.is_finished() {
                continue;
            }

            let completion = session.on_completion.take();
            session.poller = None;
            session.generation = session.generation.wrapping_add(1);
            session.backend.release();
            session.loaded = false;
            session.paused = false;
            inner.state.reset();
            completion
        };

        info!("Playback completed");
        if let Some(on_completion) = completion {
            on_completion();
        }
        return;
    }
}
