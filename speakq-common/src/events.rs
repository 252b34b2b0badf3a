//! Event types for the speakq event system
//!
//! The player uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many event broadcasting (SSE)
//! - **Command channels** (tokio::mpsc): request → single handler
//! - **Shared state** (Arc<RwLock<T>>): read-heavy access

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Playback state (whole-player, not per-item)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// Speakq event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpeakqEvent {
    /// Playback state changed (play/pause)
    PlaybackStateChanged {
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queue item started playing
    ItemStarted {
        item_id: String,
        group_label: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queue item finished (naturally or via skip)
    ItemCompleted {
        item_id: String,
        skipped: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queue item changed lifecycle status
    ItemStatusChanged {
        item_id: String,
        status: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback position update (sent on progress ticks while playing)
    PlaybackProgress {
        item_id: String,
        position_ms: u64,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed (notification only - no data)
    QueueChanged {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume changed
    VolumeChanged {
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate changed
    RateChanged {
        rate: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Synthesis voice changed
    VoiceChanged {
        voice_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SpeakqEvent {
    /// Event type name used as the SSE `event:` field
    pub fn type_str(&self) -> &'static str {
        match self {
            SpeakqEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            SpeakqEvent::ItemStarted { .. } => "ItemStarted",
            SpeakqEvent::ItemCompleted { .. } => "ItemCompleted",
            SpeakqEvent::ItemStatusChanged { .. } => "ItemStatusChanged",
            SpeakqEvent::PlaybackProgress { .. } => "PlaybackProgress",
            SpeakqEvent::QueueChanged { .. } => "QueueChanged",
            SpeakqEvent::VolumeChanged { .. } => "VolumeChanged",
            SpeakqEvent::RateChanged { .. } => "RateChanged",
            SpeakqEvent::VoiceChanged { .. } => "VoiceChanged",
        }
    }
}

/// Queue item summary for API responses and SSE snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItemInfo {
    pub item_id: String,
    pub group_label: String,
    pub status: String,
    pub has_audio: bool,
}

/// One-to-many event broadcaster backed by `tokio::sync::broadcast`
pub struct EventBus {
    tx: broadcast::Sender<SpeakqEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Old events are dropped once `capacity` unread events have accumulated
    /// for a subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SpeakqEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    pub fn emit(
        &self,
        event: SpeakqEvent,
    ) -> Result<usize, broadcast::error::SendError<SpeakqEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscribers case
    ///
    /// Used for periodic events (progress ticks) where a missing listener
    /// is normal, not an error.
    pub fn emit_lossy(&self, event: SpeakqEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("no subscribers for event: {}", e.0.type_str());
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
