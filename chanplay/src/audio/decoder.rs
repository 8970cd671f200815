//! Decoder capability
//!
//! The playback slots never talk to a concrete media backend. They drive a
//! `MediaDecoder` built by an injected `DecoderFactory`, and the decoder reports
//! asynchronous progress (`Prepared`, `Completed`, `Error`) by posting
//! `DecoderEvent`s onto the owner task's queue.
//!
//! Backend quirks are handled by choosing a different factory at startup, not
//! by branching inside the slot/channel logic.

use crate::audio::source::SoundSource;
use crate::error::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of one prepare request
///
/// A fresh id is minted for every `set_sound`. Decoder events carry the id of
/// the request they belong to, so events that arrive after the slot moved on
/// can be recognized as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(Uuid);

impl PlaybackId {
    /// Mint a new unique playback id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PlaybackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened inside the decoder
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderEventKind {
    /// Asynchronous preparation finished; `start` may now be called
    Prepared,
    /// Playback reached the end of a non-looping sound
    Completed,
    /// Preparation or playback failed
    Error(String),
}

/// Decoder → owner task notification
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderEvent {
    /// Prepare request the event belongs to
    pub playback_id: PlaybackId,
    /// Event payload
    pub kind: DecoderEventKind,
}

impl DecoderEvent {
    pub fn prepared(playback_id: PlaybackId) -> Self {
        Self { playback_id, kind: DecoderEventKind::Prepared }
    }

    pub fn completed(playback_id: PlaybackId) -> Self {
        Self { playback_id, kind: DecoderEventKind::Completed }
    }

    pub fn error(playback_id: PlaybackId, message: impl Into<String>) -> Self {
        Self { playback_id, kind: DecoderEventKind::Error(message.into()) }
    }
}

/// Sending half of the owner task's decoder event queue
pub type DecoderEventSender = mpsc::UnboundedSender<DecoderEvent>;

/// Receiving half of the owner task's decoder event queue
pub type DecoderEventReceiver = mpsc::UnboundedReceiver<DecoderEvent>;

/// Parameters of one prepare request
#[derive(Debug, Clone)]
pub struct PrepareRequest {
    pub playback_id: PlaybackId,
    /// Human-readable sound identity (for logs and errors)
    pub sound: String,
    pub source: SoundSource,
    pub looping: bool,
}

/// Asynchronous decode-and-play primitive
///
/// All methods are called from the owner task and must not block. Anything slow
/// happens in the background and is reported through `DecoderEvent`s.
pub trait MediaDecoder: Send {
    /// Open the source and begin asynchronous preparation
    ///
    /// Returns an error only when the source cannot be opened at all. Failures
    /// discovered later are reported as `DecoderEventKind::Error`.
    fn prepare(&mut self, request: PrepareRequest) -> Result<()>;

    /// Start or continue playback (only valid once prepared)
    fn start(&mut self);

    /// Pause playback, keeping the position
    fn pause(&mut self);

    /// Stop playback and rewind
    fn stop(&mut self);

    /// Abandon the current source, including any in-flight preparation
    fn reset(&mut self);

    /// Free all resources; the decoder is unusable afterwards
    fn release(&mut self);

    /// Per-side gain, 0.0-1.0
    fn set_volume(&mut self, left: f32, right: f32);

    fn set_looping(&mut self, looping: bool);

    /// Length of the prepared sound, when the backend knows it
    fn expected_duration(&self) -> Option<Duration> {
        None
    }
}

/// Builds decoders for new playback slots
pub trait DecoderFactory: Send + Sync {
    /// Create a decoder that posts its events to `events`
    fn create(&self, events: DecoderEventSender) -> Box<dyn MediaDecoder>;

    /// Strategy name for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_ids_are_unique() {
        let a = PlaybackId::new();
        let b = PlaybackId::new();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_event_constructors() {
        let id = PlaybackId::new();
        assert_eq!(DecoderEvent::prepared(id).kind, DecoderEventKind::Prepared);
        assert_eq!(DecoderEvent::completed(id).kind, DecoderEventKind::Completed);
        assert_eq!(
            DecoderEvent::error(id, "bad header").kind,
            DecoderEventKind::Error("bad header".to_string())
        );
    }
}
