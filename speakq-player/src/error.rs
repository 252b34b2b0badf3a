//! Error types for speakq-player
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Synthesis and engine-load failures are caught at the
//! orchestrator boundary and converted into per-item error status; they
//! never escape to the HTTP layer for the playback flow.

use thiserror::Error;

/// Main error type for the speakq player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Synthesis provider errors (rate limited, invalid input, unavailable)
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Audio locator could not be loaded (bad or expired locator)
    #[error("Engine load error: {0}")]
    EngineLoad(String),

    /// Audio engine operation errors
    #[error("Engine error: {0}")]
    Engine(String),

    /// Queue management errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the speakq-player Error
pub type Result<T> = std::result::Result<T, Error>;
