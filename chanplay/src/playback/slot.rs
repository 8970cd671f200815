//! Playback slot
//!
//! A slot owns one decoder and mediates the two-phase "prepare asynchronously,
//! then play" protocol. It can be restarted with a new sound any number of
//! times until it is released.
//!
//! State machine:
//!
//! ```text
//! Empty --set_sound--> Preparing --prepared--> Ready --play--> Playing
//!                          |  (pending start)                    |
//!                          +-------------prepared----------------+
//! Playing --pause--> Ready        Playing --complete--> Ready (then reset)
//! any --reset--> Empty            any --release--> Released (terminal)
//! ```
//!
//! Callback tokens: the slot owns a token from the moment `set_sound` is called,
//! whether or not the source opens. It gives the token back exactly once:
//! through `complete`/`fail` (the caller forwards it with the finished
//! notification) or through a `CallbackTokenReleasable` event on reset,
//! release, or a failed `set_sound`.

use crate::audio::decoder::{
    DecoderEventSender, DecoderFactory, MediaDecoder, PlaybackId, PrepareRequest,
};
use crate::audio::source::SoundSource;
use crate::error::{Error, Result};
use crate::playback::events::EventSink;
use chanplay_common::events::{CallbackToken, SoundEvent};
use std::sync::Arc;
use tracing::{debug, warn};

/// Slot lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No sound loaded
    Empty,
    /// Waiting for the decoder's asynchronous preparation
    Preparing,
    /// Prepared, not running
    Ready,
    /// Decoder running
    Playing,
    /// Decoder freed; slot unusable
    Released,
}

/// Sound and token handed back when a slot finishes a sound
#[derive(Debug, Clone, PartialEq)]
pub struct Finished {
    pub sound: Option<String>,
    pub token: Option<CallbackToken>,
}

/// Everything needed to build new slots
///
/// Cloned into the registry; each new slot gets a fresh decoder wired to the
/// owner task's decoder event queue and the outbound event sink.
#[derive(Clone)]
pub struct SlotContext {
    factory: Arc<dyn DecoderFactory>,
    decoder_events: DecoderEventSender,
    sound_events: EventSink,
}

impl SlotContext {
    pub fn new(
        factory: Arc<dyn DecoderFactory>,
        decoder_events: DecoderEventSender,
        sound_events: EventSink,
    ) -> Self {
        Self {
            factory,
            decoder_events,
            sound_events,
        }
    }

    /// Allocate a new empty slot
    pub fn new_slot(&self) -> PlaybackSlot {
        let decoder = self.factory.create(self.decoder_events.clone());
        PlaybackSlot::new(decoder, self.sound_events.clone())
    }

    /// Outbound event sink
    pub fn events(&self) -> &EventSink {
        &self.sound_events
    }

    /// Name of the decoder strategy in use
    pub fn decoder_name(&self) -> &'static str {
        self.factory.name()
    }
}

/// One decoder plus its sound/looping/pending state
pub struct PlaybackSlot {
    decoder: Box<dyn MediaDecoder>,
    events: EventSink,
    state: SlotState,
    sound: Option<String>,
    playback_id: Option<PlaybackId>,
    pending_start: bool,
    looping: bool,
    token: Option<CallbackToken>,
}

impl PlaybackSlot {
    pub fn new(decoder: Box<dyn MediaDecoder>, events: EventSink) -> Self {
        Self {
            decoder,
            events,
            state: SlotState::Empty,
            sound: None,
            playback_id: None,
            pending_start: false,
            looping: false,
            token: None,
        }
    }

    /// Load a new sound and begin asynchronous preparation
    ///
    /// Any previous sound is reset first. With `autoplay` the slot starts as
    /// soon as preparation finishes. On failure the slot is left `Empty` and
    /// the token has already been released.
    pub fn set_sound(
        &mut self,
        sound: &str,
        looping: bool,
        autoplay: bool,
        source: SoundSource,
        token: Option<CallbackToken>,
    ) -> Result<PlaybackId> {
        if self.state == SlotState::Released {
            if let Some(token) = token {
                self.events.emit(SoundEvent::token_releasable(token));
            }
            return Err(Error::InvalidState("Slot already released".to_string()));
        }

        self.reset();
        self.token = token;

        let playback_id = PlaybackId::new();
        let request = PrepareRequest {
            playback_id,
            sound: sound.to_string(),
            source,
            looping,
        };

        if let Err(e) = self.decoder.prepare(request) {
            warn!("Failed to load sound {}: {}", sound, e);
            self.reset();
            return Err(e);
        }

        self.decoder.set_looping(looping);
        self.state = SlotState::Preparing;
        self.sound = Some(sound.to_string());
        self.playback_id = Some(playback_id);
        self.pending_start = autoplay;
        self.looping = looping;
        debug!("Slot preparing {} ({}), autoplay={}", sound, playback_id, autoplay);

        Ok(playback_id)
    }

    /// Preparation finished for `playback_id`
    ///
    /// Starts playback if a start is pending, unless `hold` is set (global
    /// pause), in which case the start stays pending. Returns false for stale
    /// events.
    pub fn on_prepared(&mut self, playback_id: PlaybackId, hold: bool) -> bool {
        if !self.owns(playback_id) || self.state != SlotState::Preparing {
            debug!("Ignoring stale prepared event {}", playback_id);
            return false;
        }

        self.state = SlotState::Ready;
        if self.pending_start && !hold {
            self.start_decoder();
        }
        true
    }

    /// Start now if prepared, otherwise start as soon as preparation finishes
    pub fn play(&mut self) -> bool {
        match self.state {
            SlotState::Ready => self.start_decoder(),
            SlotState::Preparing => self.pending_start = true,
            SlotState::Empty | SlotState::Playing | SlotState::Released => {}
        }
        true
    }

    /// Mark a start as pending without starting, even when already prepared
    pub fn queue_start(&mut self) {
        if matches!(self.state, SlotState::Preparing | SlotState::Ready) {
            self.pending_start = true;
        }
    }

    /// Stop running audio, keeping the position; cancels a deferred start
    pub fn pause(&mut self) -> bool {
        match self.state {
            SlotState::Playing => {
                self.decoder.pause();
                self.state = SlotState::Ready;
            }
            SlotState::Preparing => self.pending_start = false,
            _ => {}
        }
        true
    }

    /// Natural end of playback for `playback_id`
    ///
    /// Returns the finished sound and hands the token over to the caller. The
    /// slot stays loaded (`Ready`) until the caller resets or releases it.
    pub fn complete(&mut self, playback_id: PlaybackId) -> Option<Finished> {
        if !self.owns(playback_id) || self.state != SlotState::Playing {
            debug!("Ignoring stale completion {}", playback_id);
            return None;
        }
        self.state = SlotState::Ready;
        self.pending_start = false;
        Some(self.take_finished())
    }

    /// Decoder failure for `playback_id`, handled like a completion
    pub fn fail(&mut self, playback_id: PlaybackId, message: &str) -> Option<Finished> {
        if !self.owns(playback_id) || !self.is_loaded() {
            debug!("Ignoring stale decoder error {}", playback_id);
            return None;
        }
        warn!(
            "Decoder error on {}: {}",
            self.sound.as_deref().unwrap_or("<none>"),
            message
        );
        if self.state == SlotState::Playing {
            self.decoder.stop();
        }
        self.state = SlotState::Ready;
        self.pending_start = false;
        Some(self.take_finished())
    }

    /// Stop and unload; releases any held token
    pub fn reset(&mut self) {
        if self.state == SlotState::Released {
            return;
        }
        if self.state == SlotState::Playing {
            self.decoder.stop();
        }
        self.decoder.reset();
        self.state = SlotState::Empty;
        self.sound = None;
        self.playback_id = None;
        self.pending_start = false;
        self.looping = false;
        self.release_token();
    }

    /// Free the decoder and any held token; terminal
    pub fn release(&mut self) {
        if self.state == SlotState::Released {
            return;
        }
        if self.state == SlotState::Playing {
            self.decoder.stop();
        }
        self.decoder.release();
        self.state = SlotState::Released;
        self.sound = None;
        self.playback_id = None;
        self.pending_start = false;
        self.release_token();
    }

    /// Apply a 0-100 volume to both sides
    pub fn set_volume(&mut self, volume: u8) {
        let gain = f32::from(volume.min(100)) / 100.0;
        self.decoder.set_volume(gain, gain);
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn sound(&self) -> Option<&str> {
        self.sound.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending_start
    }

    pub fn is_prepared(&self) -> bool {
        matches!(self.state, SlotState::Ready | SlotState::Playing)
    }

    pub fn is_playing(&self) -> bool {
        self.state == SlotState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Prepared with a start waiting (held by a global pause)
    pub fn is_held(&self) -> bool {
        self.state == SlotState::Ready && self.pending_start
    }

    /// Whether this slot's live request is `playback_id`
    pub fn owns(&self, playback_id: PlaybackId) -> bool {
        self.playback_id == Some(playback_id)
    }

    fn is_loaded(&self) -> bool {
        matches!(
            self.state,
            SlotState::Preparing | SlotState::Ready | SlotState::Playing
        )
    }

    fn start_decoder(&mut self) {
        self.decoder.start();
        self.state = SlotState::Playing;
        self.pending_start = false;
    }

    fn take_finished(&mut self) -> Finished {
        Finished {
            sound: self.sound.clone(),
            token: self.token.take(),
        }
    }

    fn release_token(&mut self) {
        if let Some(token) = self.token.take() {
            debug!("Releasing callback token {}", token);
            self.events.emit(SoundEvent::token_releasable(token));
        }
    }
}

impl Drop for PlaybackSlot {
    fn drop(&mut self) {
        self.release();
    }
}
