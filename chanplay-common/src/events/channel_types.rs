//! Channel-related type definitions
//!
//! Supporting types for channel status queries and play requests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

/// Queueing discipline for a play request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Replace whatever the channel is playing and start immediately
    Now,
    /// Play after the current sound finishes (loaded paused if the channel is idle)
    Next,
    /// Replace immediately and repeat until stopped
    Looping,
}

impl PlayMode {
    /// Whether this mode replaces the current sound right away
    pub fn is_immediate(self) -> bool {
        matches!(self, PlayMode::Now | PlayMode::Looping)
    }
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayMode::Now => write!(f, "now"),
            PlayMode::Next => write!(f, "next"),
            PlayMode::Looping => write!(f, "looping"),
        }
    }
}

impl FromStr for PlayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "now" => Ok(PlayMode::Now),
            "next" => Ok(PlayMode::Next),
            "looping" | "loop" => Ok(PlayMode::Looping),
            other => Err(Error::InvalidInput(format!("Unknown play mode: {}", other))),
        }
    }
}

/// Externally observable channel status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Audio is running, or a start is waiting on preparation
    Playing,
    /// A sound is loaded but not running
    Paused,
    /// Nothing loaded
    Stopped,
}

impl ChannelStatus {
    /// Numeric code used by the legacy line surface (`-1` is reserved for unknown channels)
    pub fn code(self) -> i32 {
        match self {
            ChannelStatus::Stopped => 0,
            ChannelStatus::Paused => 1,
            ChannelStatus::Playing => 2,
        }
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelStatus::Playing => write!(f, "playing"),
            ChannelStatus::Paused => write!(f, "paused"),
            ChannelStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Opaque caller-supplied handle correlated with a sound's completion
///
/// The sound subsystem owns a token from the moment it is handed over until it
/// is given back, either inside a `SoundFinished` event or through a
/// `CallbackTokenReleasable` event. Exactly one of the two happens per token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CallbackToken(pub u64);

impl std::fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_mode_parse() {
        assert_eq!("now".parse::<PlayMode>().unwrap(), PlayMode::Now);
        assert_eq!("NEXT".parse::<PlayMode>().unwrap(), PlayMode::Next);
        assert_eq!("loop".parse::<PlayMode>().unwrap(), PlayMode::Looping);
        assert!("later".parse::<PlayMode>().is_err());
    }

    #[test]
    fn test_play_mode_immediate() {
        assert!(PlayMode::Now.is_immediate());
        assert!(PlayMode::Looping.is_immediate());
        assert!(!PlayMode::Next.is_immediate());
    }

    #[test]
    fn test_status_codes_are_distinct() {
        assert_eq!(ChannelStatus::Stopped.code(), 0);
        assert_eq!(ChannelStatus::Paused.code(), 1);
        assert_eq!(ChannelStatus::Playing.code(), 2);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ChannelStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }
}
