//! Audio decoding capability and its implementations

pub mod clock;
pub mod decoder;
pub mod source;
pub mod watchdog;

pub use clock::{ClockDecoder, ClockDecoderFactory};
pub use decoder::{
    DecoderEvent, DecoderEventKind, DecoderEventReceiver, DecoderEventSender, DecoderFactory,
    MediaDecoder, PlaybackId, PrepareRequest,
};
pub use source::SoundSource;
pub use watchdog::{WatchdogDecoder, WatchdogFactory};
