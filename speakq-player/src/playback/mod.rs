//! Playback subsystem
//!
//! Queue store, orchestrator, and the audio engine adapter seam.

pub mod adapter;
pub mod orchestrator;
pub mod queue;
pub mod rodio_backend;

pub use adapter::{AudioEngineAdapter, EngineEvent, EngineEventSender, EngineFactory};
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use queue::{ItemStatus, QueueItem, QueueStore};
pub use rodio_backend::RodioEngineFactory;
