//! Event types for the chanplay event system
//!
//! Outbound notifications the sound subsystem raises toward its caller.

mod channel_types;

pub use channel_types::{CallbackToken, ChannelStatus, PlayMode};

use serde::{Deserialize, Serialize};

/// Outbound sound events
///
/// Events are delivered in the order the owner task produced them and can be
/// serialized as tagged JSON for line-oriented consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SoundEvent {
    /// A sound on a named channel reached its natural end
    ///
    /// Fired once per completion (decoder errors on a playing sound count as
    /// completions). The callback token, if any, is handed back with this
    /// event and is not released separately.
    SoundFinished {
        /// Channel the sound was playing on
        channel: String,
        /// Identity of the finished sound
        sound: Option<String>,
        /// Token supplied with the play request
        token: Option<CallbackToken>,
        /// When the sound finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A callback token is no longer referenced and may be freed by its owner
    ///
    /// Fired when a slot holding a token is reset, released, or fails to
    /// open its source.
    CallbackTokenReleasable {
        /// Token to free
        token: CallbackToken,
        /// When the token was released
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The legacy background player stopped on its own
    BackgroundSoundStopped {
        /// When playback stopped
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SoundEvent {
    /// Build a `SoundFinished` event stamped now
    pub fn sound_finished(
        channel: impl Into<String>,
        sound: Option<String>,
        token: Option<CallbackToken>,
    ) -> Self {
        SoundEvent::SoundFinished {
            channel: channel.into(),
            sound,
            token,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Build a `CallbackTokenReleasable` event stamped now
    pub fn token_releasable(token: CallbackToken) -> Self {
        SoundEvent::CallbackTokenReleasable {
            token,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Build a `BackgroundSoundStopped` event stamped now
    pub fn background_stopped() -> Self {
        SoundEvent::BackgroundSoundStopped {
            timestamp: chrono::Utc::now(),
        }
    }

    /// Event type name (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            SoundEvent::SoundFinished { .. } => "SoundFinished",
            SoundEvent::CallbackTokenReleasable { .. } => "CallbackTokenReleasable",
            SoundEvent::BackgroundSoundStopped { .. } => "BackgroundSoundStopped",
        }
    }

    /// Token handed back by this event, if any
    pub fn returned_token(&self) -> Option<CallbackToken> {
        match self {
            SoundEvent::SoundFinished { token, .. } => *token,
            SoundEvent::CallbackTokenReleasable { token, .. } => Some(*token),
            SoundEvent::BackgroundSoundStopped { .. } => None,
        }
    }
}
