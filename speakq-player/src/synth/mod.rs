//! Speech synthesis boundary
//!
//! Client trait + HTTP implementation, pre-synthesis text normalization,
//! and the mark-consumed collaborator.

pub mod client;
pub mod consumed;
pub mod normalize;

pub use client::{HttpSynthesisClient, SynthesisClient, SynthesizedAudio, VoiceParams};
pub use consumed::{ConsumptionNotifier, HttpConsumptionNotifier, NullConsumptionNotifier};
pub use normalize::Lexicon;
