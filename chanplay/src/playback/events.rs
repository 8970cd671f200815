//! Outbound event delivery
//!
//! The registry and its slots raise `SoundEvent`s (finished sounds, releasable
//! callback tokens, background stop) through an `EventSink`. Delivery is an
//! unbounded mpsc queue so no event is ever dropped for lack of capacity: a
//! lost token release would leak the caller's resource.

use chanplay_common::events::SoundEvent;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Cloneable sending side of the outbound event queue
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SoundEvent>,
}

impl EventSink {
    /// Create a sink and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SoundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver an event to the caller
    pub fn emit(&self, event: SoundEvent) {
        trace!("Emitting {}", event.event_type());
        if self.tx.send(event).is_err() {
            // No receiver is OK (caller not listening)
            debug!("Sound event dropped: no receiver");
        }
    }
}
