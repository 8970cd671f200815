//! Sound channel management and the owner-task service

pub mod background;
pub mod channel;
pub mod events;
pub mod registry;
pub mod service;
pub mod slot;
pub mod tokens;

pub use background::BackgroundPlayer;
pub use channel::{Channel, SlotPosition};
pub use events::EventSink;
pub use registry::{ChannelRegistry, RegistrySettings};
pub use service::{SoundHandle, SoundService};
pub use slot::{PlaybackSlot, SlotContext, SlotState};
pub use tokens::TokenTable;
