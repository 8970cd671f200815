//! Clock-driven decoder
//!
//! Treats a sound as a timeline rather than a sample stream: preparation probes
//! the media file with symphonia to learn its duration, and playback is a tokio
//! timer over the remaining time. Position survives pause/resume. Looping
//! sounds never complete.
//!
//! Produces no audible output; it gives the channel logic a real asynchronous
//! decoder with honest timing against real media files.

use crate::audio::decoder::{
    DecoderEvent, DecoderEventSender, DecoderFactory, MediaDecoder, PlaybackId, PrepareRequest,
};
use crate::audio::source::probe_duration;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Builds `ClockDecoder`s on a given tokio runtime
pub struct ClockDecoderFactory {
    runtime: Handle,
    assets_root: Option<PathBuf>,
}

impl ClockDecoderFactory {
    pub fn new(runtime: Handle, assets_root: Option<PathBuf>) -> Self {
        Self { runtime, assets_root }
    }
}

impl DecoderFactory for ClockDecoderFactory {
    fn create(&self, events: DecoderEventSender) -> Box<dyn MediaDecoder> {
        Box::new(ClockDecoder::new(self.runtime.clone(), self.assets_root.clone(), events))
    }

    fn name(&self) -> &'static str {
        "clock"
    }
}

/// Timer-based decoder over probed media durations
pub struct ClockDecoder {
    runtime: Handle,
    assets_root: Option<PathBuf>,
    events: DecoderEventSender,

    /// Prepare request currently loaded (None when reset)
    playback_id: Option<PlaybackId>,
    looping: bool,
    volume: (f32, f32),

    /// Filled in by the prepare task; a new cell per request so a cancelled
    /// probe can never write into a later request's state
    duration: Arc<Mutex<Option<Duration>>>,

    prepare_task: Option<JoinHandle<()>>,
    completion_task: Option<JoinHandle<()>>,

    playing: bool,
    /// Position accumulated before the current run
    played: Duration,
    started_at: Option<Instant>,
    released: bool,
}

impl ClockDecoder {
    pub fn new(runtime: Handle, assets_root: Option<PathBuf>, events: DecoderEventSender) -> Self {
        Self {
            runtime,
            assets_root,
            events,
            playback_id: None,
            looping: false,
            volume: (1.0, 1.0),
            duration: Arc::new(Mutex::new(None)),
            prepare_task: None,
            completion_task: None,
            playing: false,
            played: Duration::ZERO,
            started_at: None,
            released: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> (f32, f32) {
        self.volume
    }

    /// Current playback position
    pub fn position(&self) -> Duration {
        let running = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        self.wrap(self.played + running)
    }

    fn prepared_duration(&self) -> Option<Duration> {
        self.duration.lock().ok().and_then(|d| *d)
    }

    /// Fold a position back into the sound when looping
    fn wrap(&self, position: Duration) -> Duration {
        match self.prepared_duration() {
            Some(d) if self.looping && !d.is_zero() => {
                Duration::from_nanos((position.as_nanos() % d.as_nanos()) as u64)
            }
            _ => position,
        }
    }

    fn cancel_completion(&mut self) {
        if let Some(task) = self.completion_task.take() {
            task.abort();
        }
    }
}

impl MediaDecoder for ClockDecoder {
    fn prepare(&mut self, request: PrepareRequest) -> Result<()> {
        if self.released {
            return Err(Error::InvalidState("Decoder already released".to_string()));
        }
        self.reset();

        let (file, path) = request.source.open(&request.sound, self.assets_root.as_deref())?;

        let playback_id = request.playback_id;
        let duration = Arc::new(Mutex::new(None));
        self.duration = Arc::clone(&duration);
        self.playback_id = Some(playback_id);
        self.looping = request.looping;

        debug!("Preparing {} ({})", request.sound, playback_id);
        let events = self.events.clone();
        self.prepare_task = Some(self.runtime.spawn(async move {
            let probed = tokio::task::spawn_blocking(move || probe_duration(file, &path)).await;
            let event = match probed {
                Ok(Ok(length)) => {
                    if let Ok(mut cell) = duration.lock() {
                        *cell = Some(length);
                    }
                    DecoderEvent::prepared(playback_id)
                }
                Ok(Err(e)) => DecoderEvent::error(playback_id, e.to_string()),
                Err(e) => DecoderEvent::error(playback_id, format!("Probe task failed: {}", e)),
            };
            // Receiver gone means the service shut down
            let _ = events.send(event);
        }));

        Ok(())
    }

    fn start(&mut self) {
        if self.playing || self.released {
            return;
        }
        let Some(playback_id) = self.playback_id else {
            warn!("start() with no sound loaded");
            return;
        };
        let Some(duration) = self.prepared_duration() else {
            warn!("start() before preparation finished ({})", playback_id);
            return;
        };

        self.playing = true;
        self.started_at = Some(Instant::now());

        if self.looping {
            return;
        }

        let remaining = duration.saturating_sub(self.played);
        let events = self.events.clone();
        self.completion_task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(remaining).await;
            let _ = events.send(DecoderEvent::completed(playback_id));
        }));
    }

    fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.cancel_completion();
        let running = self.started_at.take().map(|t| t.elapsed()).unwrap_or_default();
        self.played = self.wrap(self.played + running);
        self.playing = false;
    }

    fn stop(&mut self) {
        self.cancel_completion();
        self.playing = false;
        self.started_at = None;
        self.played = Duration::ZERO;
    }

    fn reset(&mut self) {
        self.stop();
        if let Some(task) = self.prepare_task.take() {
            task.abort();
        }
        self.playback_id = None;
        self.looping = false;
        self.duration = Arc::new(Mutex::new(None));
    }

    fn release(&mut self) {
        self.reset();
        self.released = true;
    }

    fn set_volume(&mut self, left: f32, right: f32) {
        self.volume = (left.clamp(0.0, 1.0), right.clamp(0.0, 1.0));
    }

    fn set_looping(&mut self, looping: bool) {
        if self.looping == looping {
            return;
        }
        if self.playing {
            // Re-arm the completion timer under the new mode
            self.pause();
            self.looping = looping;
            self.start();
        } else {
            self.looping = looping;
        }
    }

    fn expected_duration(&self) -> Option<Duration> {
        self.prepared_duration()
    }
}

impl Drop for ClockDecoder {
    fn drop(&mut self) {
        self.reset();
    }
}
