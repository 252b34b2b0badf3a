//! Playback orchestration
//!
//! Owns the lifecycle from "cursor points at an item" to "audio is playing,
//! progressing, and advances". Coordinates the queue store, the synthesis
//! client and the audio engine adapter.
//!
//! The orchestrator runs as a single task draining one command channel.
//! Every mutation - user navigation, synthesis completions, engine events -
//! arrives as a command and is applied on that one timeline, which makes
//! the core invariants structural:
//!
//! - at most one live engine binding: the previous handle is stopped and
//!   released before a new item is bound;
//! - at most one applicable synthesis attempt per item: responses carry the
//!   (item id, attempt) pair captured at request time and are discarded on
//!   mismatch - navigating away bumps the attempt, so stale responses can
//!   never touch another item or the live engine;
//! - exactly-once mark-consumed: guarded by the per-item `consumed` flag,
//!   not by status (status resets on retry);
//! - exactly one subscriber reacts to cursor changes and issues `play()`:
//!   this loop.

use crate::db;
use crate::error::{Error, Result};
use crate::playback::adapter::{AudioEngineAdapter, EngineEvent, EngineFactory};
use crate::playback::queue::{ItemStatus, QueueItem, QueueStore};
use crate::state::{CurrentItem, PlaybackState, SharedState};
use crate::synth::{ConsumptionNotifier, Lexicon, SynthesisClient, SynthesizedAudio, VoiceParams};
use speakq_common::events::SpeakqEvent;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, trace, warn};

/// Commands processed by the orchestrator task
enum Command {
    Enqueue { items: Vec<QueueItem> },
    Remove { id: String },
    Clear,
    Play,
    Pause,
    Stop,
    SkipNext,
    SkipPrevious,
    JumpTo { index: usize },
    Seek { position_secs: f64 },
    SetVolume { volume: f32 },
    SetRate { rate: f32 },
    SetVoice { voice_id: String },
    Retry,
    SynthesisDone {
        item_id: String,
        attempt: u64,
        outcome: std::result::Result<SynthesizedAudio, String>,
    },
    Engine { seq: u64, event: EngineEvent },
    Shutdown,
}

/// Live binding between the orchestrator and one loaded piece of audio
struct PlaybackSession {
    /// The single live engine handle, or none
    engine: Option<Box<dyn AudioEngineAdapter>>,

    /// Item the engine is bound to
    item_id: Option<String>,

    /// Bumped on every bind/teardown; engine events from an older binding
    /// carry an older sequence and are dropped
    binding_seq: u64,

    position_secs: f64,
    duration_secs: f64,
}

impl PlaybackSession {
    fn new() -> Self {
        Self {
            engine: None,
            item_id: None,
            binding_seq: 0,
            position_secs: 0.0,
            duration_secs: 0.0,
        }
    }
}

/// Cloneable handle for submitting commands to the orchestrator
#[derive(Clone)]
pub struct OrchestratorHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    queue: Arc<RwLock<QueueStore>>,
    state: Arc<SharedState>,
}

impl OrchestratorHandle {
    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::Internal("playback orchestrator is not running".to_string()))
    }

    /// Append a batch of items to the queue
    pub fn enqueue(&self, items: Vec<QueueItem>) -> Result<()> {
        self.send(Command::Enqueue { items })
    }

    /// Remove an item by id
    pub fn remove(&self, id: impl Into<String>) -> Result<()> {
        self.send(Command::Remove { id: id.into() })
    }

    /// Empty the queue and tear down any live playback session
    pub fn clear(&self) -> Result<()> {
        self.send(Command::Clear)
    }

    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    /// Stop playback and release the engine without moving the cursor
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn skip_next(&self) -> Result<()> {
        self.send(Command::SkipNext)
    }

    pub fn skip_previous(&self) -> Result<()> {
        self.send(Command::SkipPrevious)
    }

    pub fn jump_to(&self, index: usize) -> Result<()> {
        self.send(Command::JumpTo { index })
    }

    pub fn seek(&self, position_secs: f64) -> Result<()> {
        self.send(Command::Seek { position_secs })
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Command::SetVolume { volume })
    }

    pub fn set_rate(&self, rate: f32) -> Result<()> {
        self.send(Command::SetRate { rate })
    }

    pub fn set_voice(&self, voice_id: impl Into<String>) -> Result<()> {
        self.send(Command::SetVoice {
            voice_id: voice_id.into(),
        })
    }

    /// Re-run synthesis for the current item if it is in the error state
    pub fn retry(&self) -> Result<()> {
        self.send(Command::Retry)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    /// Queue store for read access (API handlers)
    pub fn queue(&self) -> Arc<RwLock<QueueStore>> {
        Arc::clone(&self.queue)
    }

    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }
}

/// The orchestrator task state
pub struct Orchestrator {
    queue: Arc<RwLock<QueueStore>>,
    state: Arc<SharedState>,
    db: SqlitePool,
    synth: Arc<dyn SynthesisClient>,
    notifier: Arc<dyn ConsumptionNotifier>,
    engines: Arc<dyn EngineFactory>,
    lexicon: Option<Lexicon>,

    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,

    session: PlaybackSession,

    /// Saved queue selection from a previous run; applied once when the
    /// matching item shows up in an appended batch
    restore_target: Option<String>,
}

impl Orchestrator {
    /// Spawn the orchestrator task and return its handle
    pub fn spawn(
        db: SqlitePool,
        state: Arc<SharedState>,
        synth: Arc<dyn SynthesisClient>,
        notifier: Arc<dyn ConsumptionNotifier>,
        engines: Arc<dyn EngineFactory>,
        lexicon: Option<Lexicon>,
        restore_target: Option<String>,
    ) -> OrchestratorHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let queue = Arc::new(RwLock::new(QueueStore::new()));

        let handle = OrchestratorHandle {
            cmd_tx: cmd_tx.clone(),
            queue: Arc::clone(&queue),
            state: Arc::clone(&state),
        };

        let orchestrator = Self {
            queue,
            state,
            db,
            synth,
            notifier,
            engines,
            lexicon,
            cmd_tx,
            cmd_rx,
            session: PlaybackSession::new(),
            restore_target,
        };

        tokio::spawn(orchestrator.run());
        handle
    }

    async fn run(mut self) {
        info!("Playback orchestrator started");

        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                Command::Enqueue { items } => self.on_enqueue(items).await,
                Command::Remove { id } => self.on_remove(&id).await,
                Command::Clear => self.on_clear().await,
                Command::Play => self.on_play().await,
                Command::Pause => self.on_pause().await,
                Command::Stop => self.on_stop().await,
                Command::SkipNext => self.on_skip_next().await,
                Command::SkipPrevious => self.on_skip_previous().await,
                Command::JumpTo { index } => self.on_jump_to(index).await,
                Command::Seek { position_secs } => self.on_seek(position_secs).await,
                Command::SetVolume { volume } => self.on_set_volume(volume).await,
                Command::SetRate { rate } => self.on_set_rate(rate).await,
                Command::SetVoice { voice_id } => self.on_set_voice(voice_id).await,
                Command::Retry => self.on_retry().await,
                Command::SynthesisDone {
                    item_id,
                    attempt,
                    outcome,
                } => self.on_synthesis_done(item_id, attempt, outcome).await,
                Command::Engine { seq, event } => self.on_engine_event(seq, event).await,
                Command::Shutdown => break,
            }
        }

        self.teardown_engine();
        info!("Playback orchestrator stopped");
    }

    // ── Queue mutations ────────────────────────────────────────────

    async fn on_enqueue(&mut self, items: Vec<QueueItem>) {
        if items.is_empty() {
            return;
        }

        {
            let mut queue = self.queue.write().await;
            let count = queue.append(items);
            debug!("Enqueued {} items (queue length {})", count, queue.len());

            // One-shot restore of the persisted selection
            if let Some(target) = self.restore_target.take() {
                if let Some(index) = queue.position_of(&target) {
                    queue.jump_to(index);
                    info!("Restored queue selection to {}", target);
                }
            }
        }

        self.state.broadcast_event(SpeakqEvent::QueueChanged {
            timestamp: chrono::Utc::now(),
        });
        self.persist_selection().await;
        self.activate_current().await;
    }

    async fn on_remove(&mut self, id: &str) {
        let removed = self.queue.write().await.remove_by_id(id);

        if let Some(removed) = removed {
            debug!("Removed {} from queue", removed.item.id);
            self.state.broadcast_event(SpeakqEvent::QueueChanged {
                timestamp: chrono::Utc::now(),
            });

            if removed.was_current {
                // Any in-flight synthesis response for the removed item is
                // dropped on arrival (item lookup fails)
                self.teardown_engine();
                self.persist_selection().await;
                self.activate_current().await;
            }
        }
    }

    async fn on_clear(&mut self) {
        self.teardown_engine();
        self.queue.write().await.clear();
        self.state.set_current_item(None).await;
        self.persist_selection().await;
        self.state.broadcast_event(SpeakqEvent::QueueChanged {
            timestamp: chrono::Utc::now(),
        });
        info!("Queue cleared");
    }

    // ── Transport controls ─────────────────────────────────────────

    async fn on_play(&mut self) {
        self.state.set_playback_state(PlaybackState::Playing).await;
        self.state
            .broadcast_event(SpeakqEvent::PlaybackStateChanged {
                state: PlaybackState::Playing,
                timestamp: chrono::Utc::now(),
            });

        if self.session.engine.is_some() {
            let mut play_error = None;
            if let Some(engine) = self.session.engine.as_mut() {
                if let Err(e) = engine.play() {
                    play_error = Some(e.to_string());
                }
            }
            if let Some(message) = play_error {
                if let Some(id) = self.session.item_id.clone() {
                    self.teardown_engine();
                    self.fail_item(&id, message).await;
                }
                return;
            }

            // A bound-but-paused item becomes the playing slot now
            if let Some(id) = self.session.item_id.clone() {
                let started = {
                    let mut queue = self.queue.write().await;
                    match queue.get_mut(&id) {
                        Some(item) if item.status == ItemStatus::Ready => {
                            item.status = ItemStatus::Playing;
                            Some(item.group_label.clone())
                        }
                        _ => None,
                    }
                };
                if let Some(group_label) = started {
                    self.broadcast_status(&id, "playing");
                    self.state.broadcast_event(SpeakqEvent::ItemStarted {
                        item_id: id,
                        group_label,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
        } else {
            self.activate_current().await;
        }
    }

    async fn on_pause(&mut self) {
        self.state.set_playback_state(PlaybackState::Paused).await;

        // Item status stays `playing` - it marks the active slot, not the
        // literal engine state
        if let Some(engine) = self.session.engine.as_mut() {
            if let Err(e) = engine.pause() {
                warn!("pause failed: {}", e);
            }
        }

        self.state
            .broadcast_event(SpeakqEvent::PlaybackStateChanged {
                state: PlaybackState::Paused,
                timestamp: chrono::Utc::now(),
            });
    }

    async fn on_stop(&mut self) {
        self.deactivate_current().await;
        self.state.set_playback_state(PlaybackState::Paused).await;
        self.state.set_current_item(None).await;
        self.state
            .broadcast_event(SpeakqEvent::PlaybackStateChanged {
                state: PlaybackState::Paused,
                timestamp: chrono::Utc::now(),
            });
    }

    async fn on_seek(&mut self, position_secs: f64) {
        let position_secs = position_secs.max(0.0);
        if let Some(engine) = self.session.engine.as_mut() {
            match engine.seek(position_secs) {
                Ok(()) => {
                    self.session.position_secs = position_secs;
                    let duration_ms = (self.session.duration_secs * 1000.0) as u64;
                    self.state
                        .set_progress((position_secs * 1000.0) as u64, duration_ms)
                        .await;
                }
                Err(e) => warn!("seek failed: {}", e),
            }
        }
    }

    // ── Navigation ─────────────────────────────────────────────────

    async fn on_skip_next(&mut self) {
        let status = {
            let queue = self.queue.read().await;
            match queue.current() {
                Some(item) => item.status.clone(),
                None => {
                    debug!("skip next past end of queue");
                    return;
                }
            }
        };

        if status == ItemStatus::Playing {
            // User-visible equivalent of finishing: completed + consumed
            self.complete_current(true).await;
        } else {
            // Never presented - advance without marking consumed
            self.deactivate_current().await;
            self.queue.write().await.advance();
            self.persist_selection().await;
            self.activate_current().await;
        }
    }

    async fn on_skip_previous(&mut self) {
        let at_start = { self.queue.read().await.cursor() == 0 };
        if at_start {
            debug!("skip previous at start of queue");
            return;
        }

        self.deactivate_current().await;
        self.queue.write().await.retreat();
        self.persist_selection().await;
        self.activate_current().await;
    }

    async fn on_jump_to(&mut self, index: usize) {
        let changes = {
            let queue = self.queue.read().await;
            index.min(queue.len()) != queue.cursor()
        };
        if !changes {
            return;
        }

        self.deactivate_current().await;
        self.queue.write().await.jump_to(index);
        self.persist_selection().await;
        self.activate_current().await;
    }

    // ── Settings ───────────────────────────────────────────────────

    async fn on_set_volume(&mut self, volume: f32) {
        self.state.set_volume(volume).await;
        let volume = self.state.get_volume().await;

        if let Some(engine) = self.session.engine.as_mut() {
            engine.set_volume(volume);
        }
        if let Err(e) = db::settings::set_volume(&self.db, volume).await {
            warn!("failed to persist volume: {}", e);
        }
        self.state.broadcast_event(SpeakqEvent::VolumeChanged {
            volume,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn on_set_rate(&mut self, rate: f32) {
        self.state.set_rate(rate).await;
        let rate = self.state.get_rate().await;

        if let Some(engine) = self.session.engine.as_mut() {
            engine.set_rate(rate);
        }
        if let Err(e) = db::settings::set_playback_rate(&self.db, rate).await {
            warn!("failed to persist playback rate: {}", e);
        }
        self.state.broadcast_event(SpeakqEvent::RateChanged {
            rate,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn on_set_voice(&mut self, voice_id: String) {
        self.state.set_voice(voice_id.clone()).await;
        if let Err(e) = db::settings::set_voice(&self.db, voice_id.clone()).await {
            warn!("failed to persist voice: {}", e);
        }
        self.state.broadcast_event(SpeakqEvent::VoiceChanged {
            voice_id,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn on_retry(&mut self) {
        let is_error = {
            let queue = self.queue.read().await;
            queue.current().map(|item| item.status.is_error()).unwrap_or(false)
        };
        if is_error {
            self.start_synthesis().await;
        }
    }

    // ── Synthesis flow ─────────────────────────────────────────────

    /// Drive the item at the cursor toward playback
    ///
    /// No-op when the cursor item is already bound or already generating;
    /// otherwise either starts synthesis (no locator yet) or binds the
    /// engine (locator available, e.g. a re-selected completed item).
    async fn activate_current(&mut self) {
        enum Action {
            Nothing,
            Exhausted,
            Synthesize,
            Bind,
        }

        let action = {
            let queue = self.queue.read().await;
            match queue.current() {
                None => Action::Exhausted,
                Some(item) => {
                    if self.session.item_id.as_deref() == Some(item.id.as_str()) {
                        Action::Nothing
                    } else if item.status == ItemStatus::Generating {
                        // At most one outstanding synthesis call per item
                        Action::Nothing
                    } else if item.audio_locator.is_some() {
                        Action::Bind
                    } else {
                        Action::Synthesize
                    }
                }
            }
        };

        match action {
            Action::Nothing => {}
            Action::Exhausted => {
                self.teardown_engine();
                self.state.set_current_item(None).await;
                debug!("Queue exhausted");
            }
            Action::Synthesize => self.start_synthesis().await,
            Action::Bind => self.bind_current().await,
        }
    }

    /// Issue a synthesis request for the item at the cursor
    ///
    /// Bumps the item's attempt counter first; re-entering this path after
    /// an error clears the error variant. The response re-enters the
    /// command loop tagged with (id, attempt).
    async fn start_synthesis(&mut self) {
        let (item_id, group_label, attempt, text) = {
            let mut queue = self.queue.write().await;
            let Some(item) = queue.current_mut() else {
                return;
            };
            item.attempt += 1;
            item.status = ItemStatus::Generating;
            (
                item.id.clone(),
                item.group_label.clone(),
                item.attempt,
                item.source_text.clone(),
            )
        };

        self.broadcast_status(&item_id, "generating");
        self.state
            .set_current_item(Some(CurrentItem {
                item_id: item_id.clone(),
                group_label,
                position_ms: 0,
                duration_ms: 0,
            }))
            .await;

        let text = match &self.lexicon {
            Some(lexicon) if !lexicon.is_empty() => lexicon.normalize(&text),
            _ => text,
        };
        let voice = VoiceParams::new(self.state.get_voice().await);

        debug!(item_id = %item_id, attempt, "requesting synthesis");
        let synth = Arc::clone(&self.synth);
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let outcome = synth
                .synthesize(&text, &voice)
                .await
                .map_err(|e| e.to_string());
            // Orchestrator may have shut down meanwhile; nothing to do then
            let _ = cmd_tx.send(Command::SynthesisDone {
                item_id,
                attempt,
                outcome,
            });
        });
    }

    async fn on_synthesis_done(
        &mut self,
        item_id: String,
        attempt: u64,
        outcome: std::result::Result<SynthesizedAudio, String>,
    ) {
        // Apply only if the item still exists, the attempt is current, and
        // the user has not navigated away
        let applicable = {
            let queue = self.queue.read().await;
            match queue.get(&item_id) {
                None => false,
                Some(item) => {
                    item.attempt == attempt
                        && queue.current().map(|c| c.id.as_str()) == Some(item_id.as_str())
                }
            }
        };
        if !applicable {
            debug!(item_id = %item_id, attempt, "discarding stale synthesis response");
            return;
        }

        match outcome {
            Ok(audio) => {
                {
                    let mut queue = self.queue.write().await;
                    if let Some(item) = queue.get_mut(&item_id) {
                        // Set exactly once; a retry never overwrites a
                        // previously successful locator
                        if item.audio_locator.is_none() {
                            item.audio_locator = Some(audio.audio_locator);
                        }
                        item.duration_hint_secs = audio.estimated_duration_secs;
                        item.status = ItemStatus::Ready;
                    }
                }
                self.broadcast_status(&item_id, "ready");
                self.bind_current().await;
            }
            Err(message) => {
                warn!(item_id = %item_id, "synthesis failed: {}", message);
                self.queue
                    .write()
                    .await
                    .update_status(&item_id, ItemStatus::Error { message });
                self.broadcast_status(&item_id, "error");
                // Terminal for this item; navigation remains available
            }
        }
    }

    // ── Engine binding ─────────────────────────────────────────────

    /// Bind the engine to the item at the cursor and start playback if the
    /// player is in the playing state
    async fn bind_current(&mut self) {
        let snapshot = {
            let queue = self.queue.read().await;
            queue.current().and_then(|item| {
                item.audio_locator.clone().map(|locator| {
                    (
                        item.id.clone(),
                        item.group_label.clone(),
                        locator,
                        item.duration_hint_secs,
                    )
                })
            })
        };
        let Some((item_id, group_label, locator, duration_hint)) = snapshot else {
            return;
        };

        // Release the previous handle before binding a new one
        self.teardown_engine();
        let seq = self.session.binding_seq;

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if cmd_tx.send(Command::Engine { seq, event }).is_err() {
                    break;
                }
            }
        });

        let mut engine = match self.engines.create(event_tx) {
            Ok(engine) => engine,
            Err(e) => {
                self.fail_item(&item_id, e.to_string()).await;
                return;
            }
        };

        let duration_secs = match engine.load(&locator).await {
            Ok(d) if d > 0.0 => d,
            Ok(_) => duration_hint,
            Err(e) => {
                // Engine load failures are treated identically to synthesis
                // failures
                self.fail_item(&item_id, e.to_string()).await;
                return;
            }
        };

        // Orchestrator-level settings are re-applied to every new handle
        engine.set_volume(self.state.get_volume().await);
        engine.set_rate(self.state.get_rate().await);

        let autoplay = self.state.get_playback_state().await == PlaybackState::Playing;
        if autoplay {
            if let Err(e) = engine.play() {
                self.fail_item(&item_id, e.to_string()).await;
                return;
            }
        }

        self.session.engine = Some(engine);
        self.session.item_id = Some(item_id.clone());
        self.session.position_secs = 0.0;
        self.session.duration_secs = duration_secs;

        self.queue.write().await.update_status(
            &item_id,
            if autoplay {
                ItemStatus::Playing
            } else {
                ItemStatus::Ready
            },
        );

        self.state
            .set_current_item(Some(CurrentItem {
                item_id: item_id.clone(),
                group_label: group_label.clone(),
                position_ms: 0,
                duration_ms: (duration_secs * 1000.0) as u64,
            }))
            .await;

        if autoplay {
            self.broadcast_status(&item_id, "playing");
            self.state.broadcast_event(SpeakqEvent::ItemStarted {
                item_id,
                group_label,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    async fn on_engine_event(&mut self, seq: u64, event: EngineEvent) {
        if seq != self.session.binding_seq {
            trace!("dropping engine event from stale binding");
            return;
        }

        match event {
            EngineEvent::Loaded { duration_secs } => {
                if duration_secs > 0.0 {
                    self.session.duration_secs = duration_secs;
                }
            }
            EngineEvent::Progress { position_secs } => {
                self.session.position_secs = position_secs;
                let position_ms = (position_secs * 1000.0) as u64;
                let duration_ms = (self.session.duration_secs * 1000.0) as u64;
                self.state.set_progress(position_ms, duration_ms).await;

                if let Some(item_id) = self.session.item_id.clone() {
                    self.state.broadcast_event(SpeakqEvent::PlaybackProgress {
                        item_id,
                        position_ms,
                        duration_ms,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
            EngineEvent::Ended => {
                self.complete_current(false).await;
            }
            EngineEvent::Error { reason } => {
                if let Some(item_id) = self.session.item_id.clone() {
                    self.teardown_engine();
                    self.fail_item(&item_id, reason).await;
                }
            }
        }
    }

    // ── Completion ─────────────────────────────────────────────────

    /// Complete the item at the cursor (natural end or skip), fire the
    /// mark-consumed side effect at most once, advance and start the next
    async fn complete_current(&mut self, skipped: bool) {
        let completed = {
            let mut queue = self.queue.write().await;
            let Some(item) = queue.current_mut() else {
                return;
            };
            item.status = ItemStatus::Completed;
            let fire = if item.consumed {
                None
            } else {
                item.consumed = true;
                Some((item.source_id.clone(), item.id.clone()))
            };
            (item.id.clone(), fire)
        };
        let (item_id, fire) = completed;

        self.broadcast_status(&item_id, "completed");
        self.state.broadcast_event(SpeakqEvent::ItemCompleted {
            item_id: item_id.clone(),
            skipped,
            timestamp: chrono::Utc::now(),
        });

        if let Some((source_id, consumed_id)) = fire {
            self.fire_mark_consumed(source_id, consumed_id);
        }

        self.teardown_engine();
        self.queue.write().await.advance();
        self.persist_selection().await;
        self.activate_current().await;
    }

    /// Fire-and-forget consumption notification; failure is logged, never
    /// retried, and never blocks playback
    fn fire_mark_consumed(&self, source_id: String, item_id: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.mark_consumed(&source_id, &[item_id.clone()]).await {
                warn!(item_id = %item_id, "mark-consumed notification failed: {}", e);
            }
        });
    }

    // ── Helpers ────────────────────────────────────────────────────

    /// Leave the item at the cursor without completing it
    ///
    /// A playing item keeps its locator and reverts to ready; a generating
    /// item reverts to pending with its in-flight attempt invalidated.
    async fn deactivate_current(&mut self) {
        {
            let mut queue = self.queue.write().await;
            if let Some(item) = queue.current_mut() {
                match item.status {
                    ItemStatus::Playing => item.status = ItemStatus::Ready,
                    ItemStatus::Generating => {
                        item.status = ItemStatus::Pending;
                        item.attempt += 1;
                    }
                    _ => {}
                }
            }
        }
        self.teardown_engine();
    }

    /// Stop and release the live engine handle, if any
    fn teardown_engine(&mut self) {
        if let Some(mut engine) = self.session.engine.take() {
            engine.stop();
        }
        self.session.item_id = None;
        self.session.position_secs = 0.0;
        self.session.duration_secs = 0.0;
        // Events still in flight from the old binding become stale
        self.session.binding_seq += 1;
    }

    /// Convert a failure into per-item error status
    async fn fail_item(&mut self, item_id: &str, message: String) {
        warn!(item_id = %item_id, "item failed: {}", message);
        self.queue
            .write()
            .await
            .update_status(item_id, ItemStatus::Error { message });
        self.broadcast_status(item_id, "error");
    }

    fn broadcast_status(&self, item_id: &str, status: &str) {
        self.state.broadcast_event(SpeakqEvent::ItemStatusChanged {
            item_id: item_id.to_string(),
            status: status.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Persist the current queue selection for session restore
    async fn persist_selection(&mut self) {
        let selected = {
            let queue = self.queue.read().await;
            queue.current().map(|item| item.id.clone())
        };
        if let Err(e) = db::settings::save_selected_item(&self.db, selected.as_deref()).await {
            warn!("failed to persist queue selection: {}", e);
        }
    }
}
