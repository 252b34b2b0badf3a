//! API request/response types

use serde::{Deserialize, Serialize};
use speakq_common::events::QueueItemInfo;

/// One message in an enqueue batch
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnqueueItem {
    /// Originating dialog/channel id
    pub source_id: String,

    /// Message id within the source; the queue item id is derived from
    /// both
    pub message_id: i64,

    /// Text to speak
    pub text: String,

    /// Display label of origin (optional)
    #[serde(default)]
    pub group_label: Option<String>,
}

/// Enqueue request body (batch)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnqueueRequest {
    pub items: Vec<EnqueueItem>,
}

/// Enqueue response
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    /// Number of items appended
    pub enqueued: usize,
}

/// Queue listing response
#[derive(Debug, Clone, Serialize)]
pub struct QueueResponse {
    pub items: Vec<QueueItemInfo>,
    pub cursor: usize,
    pub exhausted: bool,
}

/// Playback state response
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackStateResponse {
    /// "playing" or "paused"
    pub state: String,
    pub current: Option<CurrentItemResponse>,
    pub volume: f32,
    pub rate: f32,
    pub voice_id: String,
}

/// Active item in the state response
#[derive(Debug, Clone, Serialize)]
pub struct CurrentItemResponse {
    pub item_id: String,
    pub group_label: String,
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// Volume control (0.0-1.0)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VolumeRequest {
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeResponse {
    pub volume: f32,
}

/// Playback rate control
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateRequest {
    pub rate: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateResponse {
    pub rate: f32,
}

/// Voice selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoiceRequest {
    pub voice_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceResponse {
    pub voice_id: String,
}

/// Seek request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeekRequest {
    /// Position in milliseconds
    pub position_ms: u64,
}

/// Cursor jump request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JumpRequest {
    pub index: usize,
}

/// Generic status payload for errors and acknowledgements
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            status: format!("error: {}", message),
        }
    }
}
