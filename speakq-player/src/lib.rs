//! # Speakq Player Library (speakq-player)
//!
//! Queue-driven text-to-speech playback service.
//!
//! **Purpose:** Queue chat messages, synthesize them to speech lazily,
//! play them continuously on a single audio engine binding with manual
//! navigation and an adjustable rate, and provide an HTTP/SSE control
//! interface.
//!
//! **Architecture:** One orchestrator task drains a command channel and
//! coordinates the queue store, the synthesis client and the audio engine
//! adapter. Engine backends plug in behind a capability trait; the
//! reference backend is rodio-based.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod playback;
pub mod remote;
pub mod state;
pub mod synth;

pub use error::{Error, Result};
pub use state::SharedState;
