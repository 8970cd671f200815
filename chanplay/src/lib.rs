//! # chanplay Sound Channel Library
//!
//! Multi-channel sound manager with now/next/looping queueing.
//!
//! **Purpose:** Multiplex playback requests onto named channels, each owning at
//! most a current and a queued playback slot, with transport controls, volume,
//! status queries, global pause/resume and a legacy background player.
//!
//! **Architecture:** A single owner task (`SoundService`) owns the
//! `ChannelRegistry`. Decoders are injected through `DecoderFactory` and report
//! back through one event queue consumed by the owner task.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
pub use playback::{ChannelRegistry, SoundHandle, SoundService};
