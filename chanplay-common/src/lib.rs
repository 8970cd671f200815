//! # chanplay Common Library
//!
//! Shared code for the chanplay sound channel manager:
//! - Outbound event types (SoundEvent enum)
//! - Channel status and play mode definitions
//! - Bootstrap configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{CallbackToken, ChannelStatus, PlayMode, SoundEvent};
