//! Error types for chanplay
//!
//! Defines crate-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the chanplay crate
#[derive(Error, Debug)]
pub enum Error {
    /// Errors raised by the common library
    #[error(transparent)]
    Common(#[from] chanplay_common::Error),

    /// The requested sound could not be opened
    #[error("Cannot open sound {sound}: {reason}")]
    SourceOpen { sound: String, reason: String },

    /// A control or query operation named a channel that does not exist
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// Audio probing/decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The owner task is gone
    #[error("Sound service stopped")]
    ServiceStopped,
}

/// Convenience Result type using chanplay Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_pass_through() {
        let parsed: std::result::Result<chanplay_common::events::PlayMode, _> = "sometimes".parse();
        let err: Error = parsed.unwrap_err().into();

        assert!(matches!(err, Error::Common(chanplay_common::Error::InvalidInput(_))));
        assert_eq!(err.to_string(), "Invalid input: Unknown play mode: sometimes");
    }
}
