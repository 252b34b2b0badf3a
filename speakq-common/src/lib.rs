//! # Speakq Shared Library (speakq-common)
//!
//! Event types and the broadcast event bus shared between the speakq
//! player service and its clients.

pub mod events;

pub use events::{EventBus, PlaybackState, QueueItemInfo, SpeakqEvent};
