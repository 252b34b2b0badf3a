//! Shared playback state
//!
//! Thread-safe state shared between the orchestrator, the HTTP handlers and
//! the SSE broadcaster. Uses RwLock for concurrent read access with rare
//! writes.

use speakq_common::events::SpeakqEvent;
use tokio::sync::{broadcast, RwLock};

pub use speakq_common::events::PlaybackState;

/// Lowest accepted playback rate multiplier
pub const MIN_RATE: f32 = 0.25;
/// Highest accepted playback rate multiplier
pub const MAX_RATE: f32 = 4.0;

/// Currently active queue item, as seen by API clients
#[derive(Debug, Clone)]
pub struct CurrentItem {
    pub item_id: String,
    pub group_label: String,
    /// Current position in milliseconds
    pub position_ms: u64,
    /// Total duration in milliseconds (0 if unknown)
    pub duration_ms: u64,
}

/// Shared state accessible by all components
pub struct SharedState {
    /// Whole-player playback state (Playing or Paused)
    pub playback_state: RwLock<PlaybackState>,

    /// Currently active item (None if the queue is exhausted)
    pub current_item: RwLock<Option<CurrentItem>>,

    /// Master volume (0.0-1.0)
    pub volume: RwLock<f32>,

    /// Playback rate multiplier
    pub rate: RwLock<f32>,

    /// Selected synthesis voice
    pub voice_id: RwLock<String>,

    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<SpeakqEvent>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            playback_state: RwLock::new(PlaybackState::Playing),
            current_item: RwLock::new(None),
            volume: RwLock::new(0.75),
            rate: RwLock::new(1.0),
            voice_id: RwLock::new("default".to_string()),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: SpeakqEvent) {
        // No receivers is OK
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<SpeakqEvent> {
        self.event_tx.subscribe()
    }

    pub async fn get_playback_state(&self) -> PlaybackState {
        *self.playback_state.read().await
    }

    pub async fn set_playback_state(&self, state: PlaybackState) {
        *self.playback_state.write().await = state;
    }

    pub async fn get_current_item(&self) -> Option<CurrentItem> {
        self.current_item.read().await.clone()
    }

    pub async fn set_current_item(&self, item: Option<CurrentItem>) {
        *self.current_item.write().await = item;
    }

    /// Update the progress fields of the current item, if one is set
    pub async fn set_progress(&self, position_ms: u64, duration_ms: u64) {
        if let Some(current) = self.current_item.write().await.as_mut() {
            current.position_ms = position_ms;
            current.duration_ms = duration_ms;
        }
    }

    pub async fn get_volume(&self) -> f32 {
        *self.volume.read().await
    }

    pub async fn set_volume(&self, volume: f32) {
        *self.volume.write().await = volume.clamp(0.0, 1.0);
    }

    pub async fn get_rate(&self) -> f32 {
        *self.rate.read().await
    }

    pub async fn set_rate(&self, rate: f32) {
        *self.rate.write().await = rate.clamp(MIN_RATE, MAX_RATE);
    }

    pub async fn get_voice(&self) -> String {
        self.voice_id.read().await.clone()
    }

    pub async fn set_voice(&self, voice_id: String) {
        *self.voice_id.write().await = voice_id;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
