//! Orchestrator state-machine tests
//!
//! Drive the orchestrator end to end with a scripted synthesis client
//! (calls resolve only when the test says so) and a recording engine
//! factory, then assert the lifecycle properties: exactly-once consumption,
//! stale-response discard, per-item error recovery, setting propagation and
//! the single live engine binding.

use async_trait::async_trait;
use speakq_player::db;
use speakq_player::error::{Error, Result};
use speakq_player::playback::{
    AudioEngineAdapter, EngineEvent, EngineEventSender, EngineFactory, Orchestrator,
    OrchestratorHandle, QueueItem,
};
use speakq_player::remote::{RemoteCommand, RemoteControlBridge};
use speakq_player::state::{PlaybackState, SharedState};
use speakq_player::synth::{
    ConsumptionNotifier, SynthesisClient, SynthesizedAudio, VoiceParams,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

// ── Scripted synthesis client ──────────────────────────────────────

struct PendingCall {
    text: String,
    reply: oneshot::Sender<std::result::Result<SynthesizedAudio, String>>,
}

#[derive(Default)]
struct ScriptedSynth {
    pending: Mutex<Vec<PendingCall>>,
    total_calls: AtomicUsize,
}

#[async_trait]
impl SynthesisClient for ScriptedSynth {
    async fn synthesize(&self, text: &str, _voice: &VoiceParams) -> Result<SynthesizedAudio> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(PendingCall {
            text: text.to_string(),
            reply: tx,
        });

        match rx.await {
            Ok(Ok(audio)) => Ok(audio),
            Ok(Err(message)) => Err(Error::Synthesis(message)),
            Err(_) => Err(Error::Synthesis("request dropped".to_string())),
        }
    }
}

impl ScriptedSynth {
    /// Wait for an outstanding call matching `text` and take it
    async fn take_call(&self, text: &str) -> PendingCall {
        for _ in 0..400 {
            {
                let mut pending = self.pending.lock().unwrap();
                if let Some(index) = pending.iter().position(|c| c.text == text) {
                    return pending.remove(index);
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no synthesis call for {:?} within timeout", text);
    }

    async fn resolve_ok(&self, text: &str, locator: &str) {
        let call = self.take_call(text).await;
        let _ = call.reply.send(Ok(SynthesizedAudio {
            audio_locator: locator.to_string(),
            estimated_duration_secs: 2.5,
        }));
    }

    async fn resolve_err(&self, text: &str, message: &str) {
        let call = self.take_call(text).await;
        let _ = call.reply.send(Err(message.to_string()));
    }

    fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

// ── Recording engine ───────────────────────────────────────────────

#[derive(Default)]
struct EngineProbe {
    log: Mutex<Vec<String>>,
    senders: Mutex<Vec<EngineEventSender>>,
    next_id: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    /// When set, `load()` fails with this message
    fail_load: Mutex<Option<String>>,
}

impl EngineProbe {
    fn log_op(&self, op: String) {
        self.log.lock().unwrap().push(op);
    }

    fn log_contains(&self, op: &str) -> bool {
        self.log.lock().unwrap().iter().any(|entry| entry == op)
    }

    fn log_index_of(&self, op: &str) -> Option<usize> {
        self.log.lock().unwrap().iter().position(|entry| entry == op)
    }

    /// Event sender of the most recently created engine
    fn last_sender(&self) -> EngineEventSender {
        self.senders.lock().unwrap().last().unwrap().clone()
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

struct ProbeFactory {
    probe: Arc<EngineProbe>,
}

impl EngineFactory for ProbeFactory {
    fn create(&self, events: EngineEventSender) -> Result<Box<dyn AudioEngineAdapter>> {
        let id = self.probe.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let active = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_active.fetch_max(active, Ordering::SeqCst);
        self.probe.senders.lock().unwrap().push(events);
        self.probe.log_op(format!("e{}:create", id));

        Ok(Box::new(ProbeEngine {
            probe: Arc::clone(&self.probe),
            id,
            released: false,
        }))
    }
}

struct ProbeEngine {
    probe: Arc<EngineProbe>,
    id: usize,
    released: bool,
}

impl ProbeEngine {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.probe.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl AudioEngineAdapter for ProbeEngine {
    async fn load(&mut self, locator: &str) -> Result<f64> {
        self.probe.log_op(format!("e{}:load {}", self.id, locator));
        if let Some(message) = self.probe.fail_load.lock().unwrap().clone() {
            return Err(Error::EngineLoad(message));
        }
        Ok(3.0)
    }

    fn play(&mut self) -> Result<()> {
        self.probe.log_op(format!("e{}:play", self.id));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.probe.log_op(format!("e{}:pause", self.id));
        Ok(())
    }

    fn seek(&mut self, position_secs: f64) -> Result<()> {
        self.probe.log_op(format!("e{}:seek {}", self.id, position_secs));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.probe.log_op(format!("e{}:set_volume {}", self.id, volume));
    }

    fn set_rate(&mut self, rate: f32) {
        self.probe.log_op(format!("e{}:set_rate {}", self.id, rate));
    }

    fn stop(&mut self) {
        self.probe.log_op(format!("e{}:stop", self.id));
        self.release();
    }
}

impl Drop for ProbeEngine {
    fn drop(&mut self) {
        self.release();
    }
}

// ── Recording consumption notifier ─────────────────────────────────

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl ConsumptionNotifier for RecordingNotifier {
    async fn mark_consumed(&self, source_id: &str, item_ids: &[String]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((source_id.to_string(), item_ids.to_vec()));
        Ok(())
    }
}

impl RecordingNotifier {
    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

// ── Harness ────────────────────────────────────────────────────────

struct Harness {
    handle: OrchestratorHandle,
    synth: Arc<ScriptedSynth>,
    probe: Arc<EngineProbe>,
    notifier: Arc<RecordingNotifier>,
}

async fn setup() -> Harness {
    setup_with_restore(None).await
}

async fn setup_with_restore(restore_target: Option<String>) -> Harness {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init::init_schema(&pool).await.unwrap();

    let state = Arc::new(SharedState::new());
    let synth = Arc::new(ScriptedSynth::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let probe = Arc::new(EngineProbe::default());

    let handle = Orchestrator::spawn(
        pool,
        state,
        Arc::clone(&synth) as Arc<dyn SynthesisClient>,
        Arc::clone(&notifier) as Arc<dyn ConsumptionNotifier>,
        Arc::new(ProbeFactory {
            probe: Arc::clone(&probe),
        }),
        None,
        restore_target,
    );

    Harness {
        handle,
        synth,
        probe,
        notifier,
    }
}

fn item(n: i64) -> QueueItem {
    QueueItem::new("d1", n, format!("text-{}", n), "Dialog One")
}

impl Harness {
    async fn item(&self, id: &str) -> Option<QueueItem> {
        self.handle.queue().read().await.get(id).cloned()
    }

    async fn wait_for_status(&self, id: &str, label: &str) {
        for _ in 0..400 {
            if let Some(item) = self.item(id).await {
                if item.status.label() == label {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let current = self.item(id).await.map(|i| i.status.label().to_string());
        panic!(
            "item {} never reached status {:?} (last seen {:?})",
            id, label, current
        );
    }

    async fn wait_until(&self, what: &str, check: impl Fn() -> bool) {
        for _ in 0..400 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within timeout: {}", what);
    }

    async fn cursor(&self) -> usize {
        self.handle.queue().read().await.cursor()
    }

    /// Enqueue, resolve synthesis, and wait until the item is the playing
    /// slot
    async fn play_through(&self, n: i64, locator: &str) {
        self.synth.resolve_ok(&format!("text-{}", n), locator).await;
        self.wait_for_status(&format!("d1:{}", n), "playing").await;
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn first_item_is_synthesized_and_played() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();

    // Lazy synthesis: only the cursor item gets a request
    h.play_through(1, "audio-1").await;
    assert_eq!(h.synth.total_calls(), 1);

    let a = h.item("d1:1").await.unwrap();
    assert_eq!(a.audio_locator.as_deref(), Some("audio-1"));

    // Engine saw load then play, with settings applied in between
    assert!(h.probe.log_contains("e1:load audio-1"));
    assert!(h.probe.log_contains("e1:play"));
    assert_eq!(h.probe.active(), 1);

    // Second item untouched
    let b = h.item("d1:2").await.unwrap();
    assert_eq!(b.status.label(), "pending");
}

#[tokio::test]
async fn natural_completion_consumes_once_and_advances() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();
    h.play_through(1, "audio-1").await;

    // Engine reports end of track
    h.probe.last_sender().send(EngineEvent::Ended).unwrap();

    h.wait_for_status("d1:1", "completed").await;
    h.wait_for_status("d1:2", "generating").await;
    assert_eq!(h.cursor().await, 1);

    let calls = h.notifier.calls();
    assert_eq!(calls, vec![("d1".to_string(), vec!["d1:1".to_string()])]);

    // Old engine released before the next one binds
    h.synth.resolve_ok("text-2", "audio-2").await;
    h.wait_for_status("d1:2", "playing").await;
    assert_eq!(h.probe.active(), 1);
    assert_eq!(h.probe.max_active(), 1);
}

#[tokio::test]
async fn double_skip_consumes_each_item_at_most_once() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2), item(3)]).unwrap();
    h.play_through(1, "audio-1").await;

    // Rapid double skip: the first completes item 1; the second lands on
    // item 2 while it is still generating and must not consume it
    h.handle.skip_next().unwrap();
    h.handle.skip_next().unwrap();

    h.wait_for_status("d1:3", "generating").await;
    assert_eq!(h.cursor().await, 2);

    let calls = h.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, vec!["d1:1".to_string()]);

    let b = h.item("d1:2").await.unwrap();
    assert!(!b.consumed);
    assert_eq!(b.status.label(), "pending");
}

#[tokio::test]
async fn synthesis_failure_is_terminal_until_retry() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1)]).unwrap();
    h.synth.resolve_err("text-1", "provider unavailable").await;
    h.wait_for_status("d1:1", "error").await;

    // Failure is terminal: no automatic retry, no engine binding
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.synth.total_calls(), 1);
    assert_eq!(h.probe.active(), 0);

    let a = h.item("d1:1").await.unwrap();
    assert!(a.status.to_string().contains("provider unavailable"));

    // Manual retry re-enters generating and clears the error on success
    h.handle.retry().unwrap();
    h.wait_for_status("d1:1", "generating").await;
    h.play_through(1, "audio-1-retry").await;

    let a = h.item("d1:1").await.unwrap();
    assert!(!a.status.is_error());
    assert_eq!(a.audio_locator.as_deref(), Some("audio-1-retry"));
}

#[tokio::test]
async fn stale_synthesis_response_is_discarded_after_navigation() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();

    // Item 1 is generating; navigate away before the provider answers
    let call_for_1 = h.synth.take_call("text-1").await;
    h.handle.skip_next().unwrap();
    h.wait_for_status("d1:2", "generating").await;

    // The late response for item 1 must not be applied anywhere
    let _ = call_for_1.reply.send(Ok(SynthesizedAudio {
        audio_locator: "audio-1-stale".to_string(),
        estimated_duration_secs: 2.5,
    }));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let a = h.item("d1:1").await.unwrap();
    assert_eq!(a.audio_locator, None);
    assert_eq!(a.status.label(), "pending");

    let b = h.item("d1:2").await.unwrap();
    assert_eq!(b.audio_locator, None);
    assert_eq!(b.status.label(), "generating");

    // No engine was ever bound to the stale audio
    assert!(!h.probe.log_contains("e1:load audio-1-stale"));
    assert_eq!(h.probe.active(), 0);

    // The selected item still resolves normally
    h.play_through(2, "audio-2").await;
    assert!(h.probe.log_contains("e1:load audio-2"));
}

#[tokio::test]
async fn rate_change_applies_to_current_and_future_bindings() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();
    h.play_through(1, "audio-1").await;

    h.handle.set_rate(1.5).unwrap();
    h.wait_until("rate applied to live engine", || {
        h.probe.log_contains("e1:set_rate 1.5")
    })
    .await;

    // Skip to item 2: the fresh binding must report rate 1.5 before play
    h.handle.skip_next().unwrap();
    h.play_through(2, "audio-2").await;

    let set_rate = h.probe.log_index_of("e2:set_rate 1.5").expect("rate applied");
    let play = h.probe.log_index_of("e2:play").expect("play issued");
    assert!(set_rate < play);

    assert_eq!(h.probe.max_active(), 1);
}

#[tokio::test]
async fn errored_item_does_not_block_navigation() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();
    h.synth.resolve_err("text-1", "rate limited").await;
    h.wait_for_status("d1:1", "error").await;

    h.handle.skip_next().unwrap();
    h.play_through(2, "audio-2").await;

    // The errored item keeps its message and was never consumed
    let a = h.item("d1:1").await.unwrap();
    assert!(a.status.is_error());
    assert!(!a.consumed);
    assert!(h.notifier.calls().is_empty());
}

#[tokio::test]
async fn engine_load_failure_marks_item_error() {
    let h = setup().await;
    *h.probe.fail_load.lock().unwrap() = Some("locator expired".to_string());

    h.handle.enqueue(vec![item(1)]).unwrap();
    h.synth.resolve_ok("text-1", "audio-1").await;
    h.wait_for_status("d1:1", "error").await;

    let a = h.item("d1:1").await.unwrap();
    assert!(a.status.to_string().contains("locator expired"));
    // The failed binding was released
    assert_eq!(h.probe.active(), 0);
}

#[tokio::test]
async fn pause_keeps_item_in_playing_slot() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1)]).unwrap();
    h.play_through(1, "audio-1").await;

    h.handle.pause().unwrap();
    h.wait_until("engine paused", || h.probe.log_contains("e1:pause"))
        .await;

    // Status marks the active slot, not the literal engine state
    let a = h.item("d1:1").await.unwrap();
    assert_eq!(a.status.label(), "playing");
    assert_eq!(
        h.handle.state().get_playback_state().await,
        PlaybackState::Paused
    );
}

#[tokio::test]
async fn enqueue_while_paused_binds_without_autoplay() {
    let h = setup().await;

    h.handle.pause().unwrap();
    h.handle.enqueue(vec![item(1)]).unwrap();
    h.synth.resolve_ok("text-1", "audio-1").await;

    // Selection still triggers synthesis and engine load, but not play
    h.wait_for_status("d1:1", "ready").await;
    h.wait_until("audio loaded", || h.probe.log_contains("e1:load audio-1"))
        .await;
    assert!(!h.probe.log_contains("e1:play"));

    h.handle.play().unwrap();
    h.wait_for_status("d1:1", "playing").await;
    assert!(h.probe.log_contains("e1:play"));
}

#[tokio::test]
async fn clear_tears_down_live_session() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();
    h.play_through(1, "audio-1").await;
    assert_eq!(h.probe.active(), 1);

    h.handle.clear().unwrap();
    for _ in 0..400 {
        if h.handle.queue().read().await.is_empty() && h.probe.active() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(h.handle.queue().read().await.is_empty());
    assert_eq!(h.probe.active(), 0);
    assert!(h.handle.state().get_current_item().await.is_none());
}

#[tokio::test]
async fn removing_current_item_activates_replacement() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();
    h.play_through(1, "audio-1").await;

    h.handle.remove("d1:1").unwrap();
    h.wait_for_status("d1:2", "generating").await;

    // Removal is not completion: no consumption for the removed item
    assert!(h.notifier.calls().is_empty());

    h.play_through(2, "audio-2").await;
    assert_eq!(h.probe.max_active(), 1);
}

#[tokio::test]
async fn skip_previous_rebinds_existing_audio_without_resynthesis() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();
    h.play_through(1, "audio-1").await;

    h.handle.skip_next().unwrap();
    h.play_through(2, "audio-2").await;
    assert_eq!(h.synth.total_calls(), 2);

    // Going back re-binds the stored locator; no third synthesis call
    h.handle.skip_previous().unwrap();
    h.wait_for_status("d1:1", "playing").await;
    assert_eq!(h.synth.total_calls(), 2);

    // The skipped-over item reverts to ready, keeping its audio
    let b = h.item("d1:2").await.unwrap();
    assert_eq!(b.status.label(), "ready");
    assert_eq!(b.audio_locator.as_deref(), Some("audio-2"));

    // Item 1 was consumed exactly once, by the earlier skip
    assert_eq!(h.notifier.calls().len(), 1);

    // Completing it again must not fire a second consumption
    h.probe.last_sender().send(EngineEvent::Ended).unwrap();
    h.wait_for_status("d1:1", "completed").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.notifier.calls().len(), 1);
}

#[tokio::test]
async fn retreat_at_start_is_a_noop() {
    let h = setup().await;

    h.handle.enqueue(vec![item(1)]).unwrap();
    h.play_through(1, "audio-1").await;

    h.handle.skip_previous().unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    // Still the same binding, still playing
    assert_eq!(h.cursor().await, 0);
    let a = h.item("d1:1").await.unwrap();
    assert_eq!(a.status.label(), "playing");
    assert_eq!(h.probe.active(), 1);
}

#[tokio::test]
async fn remote_bridge_maps_hardware_events_one_to_one() {
    let h = setup().await;
    let bridge = RemoteControlBridge::new(h.handle.clone());

    h.handle.enqueue(vec![item(1), item(2)]).unwrap();
    h.play_through(1, "audio-1").await;

    bridge.dispatch(RemoteCommand::Pause).unwrap();
    h.wait_until("engine paused", || h.probe.log_contains("e1:pause"))
        .await;

    // Resume goes to the same binding, not a new one
    bridge.dispatch(RemoteCommand::Play).unwrap();
    h.wait_until("engine resumed", || {
        h.probe
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.as_str() == "e1:play")
            .count()
            >= 2
    })
    .await;

    bridge
        .dispatch(RemoteCommand::Seek { position_secs: 1.25 })
        .unwrap();
    h.wait_until("seek forwarded", || h.probe.log_contains("e1:seek 1.25"))
        .await;

    bridge.dispatch(RemoteCommand::Next).unwrap();
    h.wait_for_status("d1:2", "generating").await;
    assert_eq!(h.notifier.calls().len(), 1);
}

#[tokio::test]
async fn restore_target_moves_cursor_on_first_append() {
    let h = setup_with_restore(Some("d1:2".to_string())).await;

    h.handle.enqueue(vec![item(1), item(2), item(3)]).unwrap();
    h.wait_for_status("d1:2", "generating").await;
    assert_eq!(h.cursor().await, 1);

    // One-shot: later appends leave the cursor alone
    h.handle.enqueue(vec![item(4)]).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.cursor().await, 1);
}
