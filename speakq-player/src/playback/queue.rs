//! Playback queue
//!
//! Ordered collection of text-to-speech work items plus a cursor. Pure data
//! and mutation operations; no I/O. Insertion order is playback order and
//! items are never reordered implicitly.
//!
//! The cursor satisfies `0 <= cursor <= items.len()`; `cursor == len` means
//! the queue is exhausted (not an error). The cursor only moves through the
//! explicit navigation operations (`advance`, `retreat`, `jump_to`) and the
//! documented `remove_by_id` adjustment.

use serde::Serialize;
use speakq_common::events::QueueItemInfo;
use std::fmt;

/// Lifecycle status of one queue item
///
/// The error message lives inside the variant, so a successful retry cannot
/// leave a stale message behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting for the cursor to select it
    Pending,
    /// A synthesis request is outstanding
    Generating,
    /// Audio locator available, not yet the active slot
    Ready,
    /// The active slot at the cursor (audio may be paused; see
    /// `SharedState::playback_state` for the literal engine state)
    Playing,
    /// Fully presented or skipped past
    Completed,
    /// Synthesis or engine load failed; user-recoverable via re-selection
    Error { message: String },
}

impl ItemStatus {
    /// Short label used in events and API responses
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Generating => "generating",
            ItemStatus::Ready => "ready",
            ItemStatus::Playing => "playing",
            ItemStatus::Completed => "completed",
            ItemStatus::Error { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ItemStatus::Error { .. })
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Error { message } => write!(f, "error: {}", message),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// One message-to-speech work unit
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// Stable unique identifier, derived from source dialog + message id
    pub id: String,

    /// Originating dialog/channel id, carried for the mark-consumed call
    pub source_id: String,

    /// Raw text to be spoken
    pub source_text: String,

    /// Display label of origin (not used by logic)
    pub group_label: String,

    /// Synthesized audio reference; set exactly once per item. A retry
    /// after an error is a new attempt but never overwrites a previously
    /// successful locator.
    pub audio_locator: Option<String>,

    /// Lifecycle status
    pub status: ItemStatus,

    /// Provider duration estimate in seconds; used until the engine
    /// reports a real duration for the loaded audio
    pub duration_hint_secs: f64,

    /// Guard for the mark-consumed side effect. Independent of `status`
    /// because status can be reset when an item is re-selected.
    pub consumed: bool,

    /// Synthesis attempt counter. Captured when a request is issued and
    /// compared when the response arrives; a mismatch means the response
    /// is stale and must be discarded.
    pub attempt: u64,
}

impl QueueItem {
    /// Create a new pending item from a source message
    pub fn new(
        source_id: impl Into<String>,
        message_id: i64,
        source_text: impl Into<String>,
        group_label: impl Into<String>,
    ) -> Self {
        let source_id = source_id.into();
        Self {
            id: format!("{}:{}", source_id, message_id),
            source_id,
            source_text: source_text.into(),
            group_label: group_label.into(),
            audio_locator: None,
            status: ItemStatus::Pending,
            duration_hint_secs: 0.0,
            consumed: false,
            attempt: 0,
        }
    }

    /// Summary view for API responses and SSE snapshots
    pub fn info(&self) -> QueueItemInfo {
        QueueItemInfo {
            item_id: self.id.clone(),
            group_label: self.group_label.clone(),
            status: self.status.label().to_string(),
            has_audio: self.audio_locator.is_some(),
        }
    }
}

/// Result of removing an item from the queue
#[derive(Debug)]
pub struct RemovedItem {
    pub item: QueueItem,
    /// The removed item was the one at the cursor; the caller must tear
    /// down any live engine binding for it.
    pub was_current: bool,
}

/// Ordered queue of work items plus a cursor
#[derive(Debug, Default)]
pub struct QueueStore {
    items: Vec<QueueItem>,
    cursor: usize,
}

impl QueueStore {
    /// Create a new empty queue
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
        }
    }

    /// Append items to the end of the queue
    ///
    /// Does not alter the cursor. An empty batch is a no-op. Returns the
    /// number of items appended.
    pub fn append(&mut self, items: Vec<QueueItem>) -> usize {
        if items.is_empty() {
            return 0;
        }
        let count = items.len();
        self.items.extend(items);
        count
    }

    /// Remove an item by id
    ///
    /// If the removed index was before the cursor, the cursor decrements by
    /// one. If it was at the cursor, the cursor stays put and now points to
    /// the item that shifted into the slot (or to `len()` if it was last).
    /// Returns `None` if the id is unknown.
    pub fn remove_by_id(&mut self, id: &str) -> Option<RemovedItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        let was_current = index == self.cursor;
        let item = self.items.remove(index);

        if index < self.cursor {
            self.cursor -= 1;
        }
        // index == cursor: cursor unchanged, already valid (may equal len)

        Some(RemovedItem { item, was_current })
    }

    /// Empty the queue and reset the cursor
    ///
    /// The caller (orchestrator) is responsible for tearing down any live
    /// playback session.
    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = 0;
    }

    /// Update the status of an item by id
    ///
    /// Fails silently (no-op, returns false) if the id is not found - the
    /// item may have been removed by a concurrent user action.
    pub fn update_status(&mut self, id: &str, status: ItemStatus) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.status = status;
                true
            }
            None => false,
        }
    }

    /// Item at the cursor, or `None` if the queue is exhausted
    pub fn current(&self) -> Option<&QueueItem> {
        self.items.get(self.cursor)
    }

    /// Mutable item at the cursor
    pub fn current_mut(&mut self) -> Option<&mut QueueItem> {
        self.items.get_mut(self.cursor)
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Look up a mutable item by id
    pub fn get_mut(&mut self, id: &str) -> Option<&mut QueueItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Index of an item by id
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Move the cursor forward by one
    ///
    /// Advancing past the last item leaves the cursor at `len()`
    /// (exhausted, not an error). Returns whether the cursor moved.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.items.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Move the cursor back by one
    ///
    /// Retreating past 0 is a no-op. Returns whether the cursor moved.
    pub fn retreat(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Move the cursor to an arbitrary index, clamped to `[0, len()]`
    ///
    /// Returns whether the cursor changed.
    pub fn jump_to(&mut self, index: usize) -> bool {
        let clamped = index.min(self.items.len());
        if clamped == self.cursor {
            false
        } else {
            self.cursor = clamped;
            true
        }
    }

    /// Current cursor position
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The cursor has moved past the last item
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in playback order
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Summary views of all items, for API responses
    pub fn snapshot(&self) -> Vec<QueueItemInfo> {
        self.items.iter().map(QueueItem::info).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: i64) -> QueueItem {
        QueueItem::new("dialog-1", n, format!("message {}", n), "Dialog One")
    }

    #[test]
    fn test_new_queue_is_empty_and_exhausted() {
        let queue = QueueStore::new();
        assert!(queue.is_empty());
        assert_eq!(queue.cursor(), 0);
        assert!(queue.is_exhausted());
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_item_id_derivation() {
        let i = item(42);
        assert_eq!(i.id, "dialog-1:42");
        assert_eq!(i.status, ItemStatus::Pending);
        assert!(!i.consumed);
    }

    #[test]
    fn test_append_does_not_move_cursor() {
        let mut queue = QueueStore::new();
        assert_eq!(queue.append(vec![item(1), item(2)]), 2);
        assert_eq!(queue.cursor(), 0);
        assert_eq!(queue.len(), 2);

        queue.advance();
        assert_eq!(queue.append(vec![item(3)]), 1);
        assert_eq!(queue.cursor(), 1);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_append_empty_is_noop() {
        let mut queue = QueueStore::new();
        assert_eq!(queue.append(vec![]), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_advance_twice_scenario() {
        // queue = [X, Y, Z], cursor = 0; advance twice -> cursor = 2, current = Z
        let mut queue = QueueStore::new();
        queue.append(vec![item(1), item(2), item(3)]);

        assert!(queue.advance());
        assert!(queue.advance());
        assert_eq!(queue.cursor(), 2);
        assert_eq!(queue.current().unwrap().id, "dialog-1:3");
    }

    #[test]
    fn test_advance_retreat_round_trip() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1), item(2), item(3)]);
        queue.jump_to(1);

        assert!(queue.advance());
        assert!(queue.retreat());
        assert_eq!(queue.cursor(), 1);
    }

    #[test]
    fn test_advance_past_end_exhausts() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1)]);

        assert!(queue.advance());
        assert_eq!(queue.cursor(), 1);
        assert!(queue.is_exhausted());
        assert!(queue.current().is_none());

        // Further advances are no-ops, not errors
        assert!(!queue.advance());
        assert_eq!(queue.cursor(), 1);
    }

    #[test]
    fn test_retreat_at_zero_is_noop() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1)]);

        assert!(!queue.retreat());
        assert_eq!(queue.cursor(), 0);
    }

    #[test]
    fn test_jump_to_clamps() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1), item(2)]);

        assert!(queue.jump_to(99));
        assert_eq!(queue.cursor(), 2);
        assert!(queue.is_exhausted());

        assert!(queue.jump_to(0));
        assert_eq!(queue.cursor(), 0);
    }

    #[test]
    fn test_remove_before_cursor_decrements() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1), item(2), item(3)]);
        queue.jump_to(2);

        let removed = queue.remove_by_id("dialog-1:1").unwrap();
        assert!(!removed.was_current);
        assert_eq!(queue.cursor(), 1);
        assert_eq!(queue.current().unwrap().id, "dialog-1:3");
    }

    #[test]
    fn test_remove_at_cursor_keeps_cursor() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1), item(2), item(3)]);
        queue.jump_to(1);

        let removed = queue.remove_by_id("dialog-1:2").unwrap();
        assert!(removed.was_current);
        // Cursor stays; now points to the item that shifted into the slot
        assert_eq!(queue.cursor(), 1);
        assert_eq!(queue.current().unwrap().id, "dialog-1:3");
    }

    #[test]
    fn test_remove_last_at_cursor_exhausts() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1), item(2)]);
        queue.jump_to(1);

        let removed = queue.remove_by_id("dialog-1:2").unwrap();
        assert!(removed.was_current);
        assert_eq!(queue.cursor(), 1);
        assert!(queue.is_exhausted());
    }

    #[test]
    fn test_remove_after_cursor_leaves_cursor() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1), item(2), item(3)]);

        let removed = queue.remove_by_id("dialog-1:3").unwrap();
        assert!(!removed.was_current);
        assert_eq!(queue.cursor(), 0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1)]);

        assert!(queue.remove_by_id("nope").is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_update_status_unknown_id_is_silent_noop() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1)]);

        assert!(!queue.update_status("nope", ItemStatus::Ready));
        assert_eq!(queue.current().unwrap().status, ItemStatus::Pending);
    }

    #[test]
    fn test_update_status() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1)]);

        assert!(queue.update_status(
            "dialog-1:1",
            ItemStatus::Error {
                message: "provider unavailable".to_string()
            }
        ));
        let status = &queue.current().unwrap().status;
        assert!(status.is_error());
        assert_eq!(status.label(), "error");
    }

    #[test]
    fn test_clear_resets() {
        let mut queue = QueueStore::new();
        queue.append(vec![item(1), item(2)]);
        queue.advance();

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.cursor(), 0);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ItemStatus::Pending.to_string(), "pending");
        assert_eq!(
            ItemStatus::Error {
                message: "boom".to_string()
            }
            .to_string(),
            "error: boom"
        );
    }
}
