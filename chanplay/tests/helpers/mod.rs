//! Test helper modules for chanplay integration tests
//!
//! - MockFactory / MockLog: recording decoder with scripted failures
//! - audio_generator: WAV fixtures for the clock decoder
//! - registry helpers: a registry wired to the mock, plus event draining

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_decoder;

pub use audio_generator::{generate_silent_wav, generate_sine_wav};
pub use mock_decoder::{MockCall, MockFactory, MockLog};

use chanplay::audio::DecoderEvent;
use chanplay::playback::{ChannelRegistry, EventSink, RegistrySettings, SlotContext};
use chanplay_common::events::SoundEvent;
use tokio::sync::mpsc;

/// Registry wired to a fresh mock factory
///
/// Decoder events are not pumped automatically; tests feed them through
/// `ChannelRegistry::handle_decoder_event`.
pub struct TestRegistry {
    pub registry: ChannelRegistry,
    pub log: MockLog,
    pub events: mpsc::UnboundedReceiver<SoundEvent>,
    pub decoder_events: mpsc::UnboundedReceiver<DecoderEvent>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::with_settings(RegistrySettings::default())
    }

    pub fn with_settings(settings: RegistrySettings) -> Self {
        let (factory, log) = MockFactory::new();
        let (decoder_tx, decoder_events) = mpsc::unbounded_channel();
        let (sink, events) = EventSink::new();
        let registry = ChannelRegistry::new(SlotContext::new(factory, decoder_tx, sink), settings);
        Self {
            registry,
            log,
            events,
            decoder_events,
        }
    }

    /// Deliver `Prepared` for the latest prepare of `sound`
    pub fn prepared(&mut self, sound: &str) {
        let id = self.log.playback_id(sound);
        self.registry.handle_decoder_event(DecoderEvent::prepared(id));
    }

    /// Deliver `Completed` for the latest prepare of `sound`
    pub fn completed(&mut self, sound: &str) {
        let id = self.log.playback_id(sound);
        self.registry.handle_decoder_event(DecoderEvent::completed(id));
    }

    /// Deliver `Error` for the latest prepare of `sound`
    pub fn failed(&mut self, sound: &str, message: &str) {
        let id = self.log.playback_id(sound);
        self.registry
            .handle_decoder_event(DecoderEvent::error(id, message));
    }

    /// Everything emitted so far
    pub fn drain_events(&mut self) -> Vec<SoundEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}
