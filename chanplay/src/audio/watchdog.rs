//! Completion watchdog strategy
//!
//! Some media backends occasionally never deliver their completion
//! notification. `WatchdogDecoder` wraps any decoder and posts a synthetic
//! `Completed` once the sound's expected duration (plus a grace period) has
//! been played. If the real notification arrives first, the synthetic one is
//! stale by the time it reaches the slot and is dropped there.
//!
//! Selected at startup with `decoder.profile = "completion_watchdog"`.

use crate::audio::decoder::{
    DecoderEvent, DecoderEventSender, DecoderFactory, MediaDecoder, PlaybackId, PrepareRequest,
};
use crate::error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Wraps another factory's decoders in a `WatchdogDecoder`
pub struct WatchdogFactory {
    inner: Arc<dyn DecoderFactory>,
    runtime: Handle,
    grace: Duration,
}

impl WatchdogFactory {
    pub fn new(inner: Arc<dyn DecoderFactory>, runtime: Handle, grace: Duration) -> Self {
        Self { inner, runtime, grace }
    }
}

impl DecoderFactory for WatchdogFactory {
    fn create(&self, events: DecoderEventSender) -> Box<dyn MediaDecoder> {
        let inner = self.inner.create(events.clone());
        Box::new(WatchdogDecoder::new(inner, self.runtime.clone(), events, self.grace))
    }

    fn name(&self) -> &'static str {
        "completion_watchdog"
    }
}

/// Decoder wrapper that forces a completion if the inner decoder forgets to
pub struct WatchdogDecoder {
    inner: Box<dyn MediaDecoder>,
    runtime: Handle,
    events: DecoderEventSender,
    grace: Duration,

    playback_id: Option<PlaybackId>,
    looping: bool,
    playing: bool,
    played: Duration,
    started_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl WatchdogDecoder {
    pub fn new(
        inner: Box<dyn MediaDecoder>,
        runtime: Handle,
        events: DecoderEventSender,
        grace: Duration,
    ) -> Self {
        Self {
            inner,
            runtime,
            events,
            grace,
            playback_id: None,
            looping: false,
            playing: false,
            played: Duration::ZERO,
            started_at: None,
            timer: None,
        }
    }

    /// Whether a synthetic completion is currently scheduled
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    fn arm(&mut self) {
        self.disarm();
        if self.looping {
            return;
        }
        let (Some(playback_id), Some(duration)) = (self.playback_id, self.inner.expected_duration())
        else {
            return;
        };

        let deadline = duration.saturating_sub(self.played) + self.grace;
        let events = self.events.clone();
        self.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(deadline).await;
            debug!("Watchdog forcing completion for {}", playback_id);
            let _ = events.send(DecoderEvent::completed(playback_id));
        }));
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn rewind(&mut self) {
        self.disarm();
        self.playing = false;
        self.started_at = None;
        self.played = Duration::ZERO;
    }
}

impl MediaDecoder for WatchdogDecoder {
    fn prepare(&mut self, request: PrepareRequest) -> Result<()> {
        self.rewind();
        self.playback_id = None;
        let playback_id = request.playback_id;
        let looping = request.looping;
        self.inner.prepare(request)?;
        self.playback_id = Some(playback_id);
        self.looping = looping;
        Ok(())
    }

    fn start(&mut self) {
        self.inner.start();
        if !self.playing {
            self.playing = true;
            self.started_at = Some(Instant::now());
            self.arm();
        }
    }

    fn pause(&mut self) {
        self.inner.pause();
        if self.playing {
            self.disarm();
            self.played += self.started_at.take().map(|t| t.elapsed()).unwrap_or_default();
            self.playing = false;
        }
    }

    fn stop(&mut self) {
        self.inner.stop();
        self.rewind();
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.rewind();
        self.playback_id = None;
        self.looping = false;
    }

    fn release(&mut self) {
        self.inner.release();
        self.rewind();
        self.playback_id = None;
    }

    fn set_volume(&mut self, left: f32, right: f32) {
        self.inner.set_volume(left, right);
    }

    fn set_looping(&mut self, looping: bool) {
        self.inner.set_looping(looping);
        self.looping = looping;
        if self.playing {
            // Fold the running segment in before re-arming
            self.played += self.started_at.replace(Instant::now()).map(|t| t.elapsed()).unwrap_or_default();
            self.arm();
        }
    }

    fn expected_duration(&self) -> Option<Duration> {
        self.inner.expected_duration()
    }
}

impl Drop for WatchdogDecoder {
    fn drop(&mut self) {
        self.disarm();
    }
}
