use crate::{
    CoreResult,
    audio::AudioCapture,
    session::{CaptureEvent, RecordingResult},
};

use std::{future::Future, path::Path, time::Duration};

use tracing::{debug, info, instrument};

/// Drives one capture from start until its limit or an external stop.
pub struct RecordingSession<'a> {
    capture: &'a AudioCapture,
    max_duration: Option<Duration>,
}

impl<'a> RecordingSession<'a> {
    /// Session over `capture`, auto-stopping after `max_duration` if given.
    pub fn new(capture: &'a AudioCapture, max_duration: Option<Duration>) -> Self {
        Self {
            capture,
            max_duration,
        }
    }

    /// Records into `output` until the capture raises `Stop` or `stop_signal`
    /// resolves, then finalizes.
    ///
    /// Only a failed `start` is an error; everything after that resolves to
    /// a (possibly empty) [`RecordingResult`].
    #[instrument(skip(self, output, stop_signal), fields(output = ?output.as_ref()))]
    pub async fn record_until_limit(
        &self,
        output: impl AsRef<Path>,
        stop_signal: impl Future<Output = ()>,
    ) -> CoreResult<RecordingResult> {
        // Subscribe first so a very short limit cannot fire unseen.
        let mut events = self.capture.events();
        self.capture.start(output, self.max_duration).await?;

        tokio::pin!(stop_signal);
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(CaptureEvent::Warning) => {
                        info!("Recording limit approaching");
                    }
                    Some(CaptureEvent::Stop) => {
                        debug!("Capture requested stop");
                        break;
                    }
                    None => break,
                },
                _ = &mut stop_signal => {
                    debug!("Caller requested stop");
                    break;
                }
            }
        }

        Ok(self.capture.stop().await)
    }
}
