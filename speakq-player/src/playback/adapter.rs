//! Audio engine capability contract
//!
//! The orchestrator drives audio through this seam; it never touches a
//! concrete backend directly. Backends must be substitutable without
//! orchestrator changes - the reference backend here is rodio-based
//! (`rodio_backend`), and tests use a scripted mock.
//!
//! Events flow over an mpsc channel handed to the backend at construction.
//! A backend must emit `Progress` on a fixed cadence only while audio is
//! actually playing, and `Ended` exactly once per load - never after
//! `stop()`.

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events emitted by an audio engine backend
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Duration became known (backends that refine the `load()` estimate
    /// asynchronously re-emit this)
    Loaded { duration_secs: f64 },

    /// Playback position tick; emitted only while playing
    Progress { position_secs: f64 },

    /// Playback reached the end of the loaded audio
    Ended,

    /// Backend failure after a successful load
    Error { reason: String },
}

/// Sending half of a backend's event channel
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half of a backend's event channel
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Capability wrapper around one loaded piece of audio
///
/// Exactly one adapter instance is live at a time; the orchestrator stops
/// and releases the previous instance before binding a new one.
#[async_trait]
pub trait AudioEngineAdapter: Send {
    /// Load audio from a locator (file path or URL)
    ///
    /// Returns the duration in seconds, or `0.0` if the container does not
    /// carry one (the orchestrator falls back to the synthesis estimate).
    /// Loading never starts playback.
    async fn load(&mut self, locator: &str) -> Result<f64>;

    /// Start or resume playback
    fn play(&mut self) -> Result<()>;

    /// Pause playback, keeping the loaded audio and position
    fn pause(&mut self) -> Result<()>;

    /// Seek to a position in seconds
    fn seek(&mut self, position_secs: f64) -> Result<()>;

    /// Set volume, 0.0..=1.0
    fn set_volume(&mut self, volume: f32);

    /// Set playback rate multiplier (1.0 = normal)
    fn set_rate(&mut self, rate: f32);

    /// Stop playback and release the loaded audio
    ///
    /// After `stop()` the adapter emits no further events for this load;
    /// in particular `Ended` never fires retroactively.
    fn stop(&mut self);
}

/// Creates engine backends on demand
///
/// The orchestrator asks for a fresh adapter per bound item and hands it
/// the event sender for that binding.
pub trait EngineFactory: Send + Sync {
    fn create(&self, events: EngineEventSender) -> Result<Box<dyn AudioEngineAdapter>>;
}
