//! Rodio reference backend for the audio engine contract
//!
//! `rodio::OutputStream` is not `Send` on some platforms, so the stream and
//! sink are confined to a dedicated OS thread and every operation is proxied
//! through a command channel. The adapter struct the orchestrator holds is
//! the `Send` proxy.
//!
//! A watcher thread emits `Progress` ticks while audio is playing and a
//! single `Ended` when the sink drains naturally. `stop()` raises a flag the
//! watcher checks first, so `Ended` never fires after a stop.

use crate::error::{Error, Result};
use crate::playback::adapter::{AudioEngineAdapter, EngineEvent, EngineEventSender, EngineFactory};
use async_trait::async_trait;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Progress tick cadence while playing
const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Commands sent from the adapter to the audio thread
enum SinkCommand {
    Load {
        bytes: Vec<u8>,
        reply: mpsc::Sender<std::result::Result<f64, String>>,
    },
    Play,
    Pause,
    Seek {
        position: Duration,
    },
    SetVolume(f32),
    SetRate(f32),
    Position {
        reply: mpsc::Sender<Option<Duration>>,
    },
    IsDrained {
        reply: mpsc::Sender<bool>,
    },
    Stop,
    Shutdown,
}

/// Factory producing rodio-backed engine adapters
///
/// Each `create()` spawns a fresh audio thread; the orchestrator binds one
/// adapter per queue item and drops it before the next bind.
pub struct RodioEngineFactory {
    http: reqwest::Client,
}

impl RodioEngineFactory {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for RodioEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for RodioEngineFactory {
    fn create(&self, events: EngineEventSender) -> Result<Box<dyn AudioEngineAdapter>> {
        Ok(Box::new(RodioEngine::spawn(events, self.http.clone())?))
    }
}

/// `Send` proxy to the audio thread owning the rodio stream and sink
pub struct RodioEngine {
    cmd_tx: mpsc::Sender<SinkCommand>,
    thread: Option<thread::JoinHandle<()>>,
    events: EngineEventSender,
    http: reqwest::Client,

    /// Audio is supposed to be progressing (set on play, cleared on pause/stop)
    playing: Arc<AtomicBool>,

    /// stop() was called; the watcher must not emit `Ended`
    stopped: Arc<AtomicBool>,

    watcher_started: bool,
}

impl RodioEngine {
    fn spawn(events: EngineEventSender, http: reqwest::Client) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<SinkCommand>();
        let (init_tx, init_rx) = mpsc::channel::<std::result::Result<(), String>>();

        let thread = thread::Builder::new()
            .name("speakq-audio".into())
            .spawn(move || audio_thread(cmd_rx, init_tx))
            .map_err(|e| Error::Engine(format!("failed to spawn audio thread: {}", e)))?;

        // Wait for the output device to open on the audio thread
        init_rx
            .recv()
            .map_err(|_| Error::Engine("audio thread died during init".to_string()))?
            .map_err(Error::Engine)?;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
            events,
            http,
            playing: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            watcher_started: false,
        })
    }

    fn send(&self, cmd: SinkCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::Engine("audio thread is not running".to_string()))
    }

    /// Fetch the audio bytes behind a locator (local path or http(s) URL)
    ///
    /// Associated function on purpose: the adapter itself is not `Sync`
    /// (it holds the audio-thread command sender), so the await here must
    /// only borrow the http client.
    async fn fetch_bytes(http: &reqwest::Client, locator: &str) -> Result<Vec<u8>> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            let response = http
                .get(locator)
                .send()
                .await
                .map_err(|e| Error::EngineLoad(format!("fetch failed: {}", e)))?
                .error_for_status()
                .map_err(|e| Error::EngineLoad(format!("fetch failed: {}", e)))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::EngineLoad(format!("fetch failed: {}", e)))?;
            Ok(bytes.to_vec())
        } else {
            tokio::fs::read(locator)
                .await
                .map_err(|e| Error::EngineLoad(format!("read {} failed: {}", locator, e)))
        }
    }

    /// Spawn the progress/completion watcher for the current load
    fn start_watcher(&mut self) {
        if self.watcher_started {
            return;
        }
        self.watcher_started = true;

        let cmd_tx = self.cmd_tx.clone();
        let events = self.events.clone();
        let playing = Arc::clone(&self.playing);
        let stopped = Arc::clone(&self.stopped);

        thread::spawn(move || {
            loop {
                thread::sleep(TICK_INTERVAL);

                if stopped.load(Ordering::SeqCst) {
                    return;
                }

                let (tx, rx) = mpsc::channel();
                if cmd_tx.send(SinkCommand::IsDrained { reply: tx }).is_err() {
                    return;
                }
                let drained = rx.recv().unwrap_or(true);

                if drained {
                    // Natural completion; suppressed if stop() raced us
                    if !stopped.load(Ordering::SeqCst) {
                        let _ = events.send(EngineEvent::Ended);
                    }
                    return;
                }

                if playing.load(Ordering::SeqCst) {
                    let (tx, rx) = mpsc::channel();
                    if cmd_tx.send(SinkCommand::Position { reply: tx }).is_err() {
                        return;
                    }
                    if let Ok(Some(position)) = rx.recv() {
                        let _ = events.send(EngineEvent::Progress {
                            position_secs: position.as_secs_f64(),
                        });
                    }
                }
            }
        });
    }
}

#[async_trait]
impl AudioEngineAdapter for RodioEngine {
    async fn load(&mut self, locator: &str) -> Result<f64> {
        let http = self.http.clone();
        let bytes = Self::fetch_bytes(&http, locator).await?;

        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(SinkCommand::Load {
            bytes,
            reply: reply_tx,
        })?;

        // The reply channel is std mpsc; park the blocking recv off the runtime
        let outcome = tokio::task::spawn_blocking(move || reply_rx.recv())
            .await
            .map_err(|e| Error::Engine(format!("load join error: {}", e)))?
            .map_err(|_| Error::Engine("audio thread died during load".to_string()))?;

        let duration_secs = outcome.map_err(Error::EngineLoad)?;
        if duration_secs > 0.0 {
            let _ = self.events.send(EngineEvent::Loaded { duration_secs });
        }
        Ok(duration_secs)
    }

    fn play(&mut self) -> Result<()> {
        self.playing.store(true, Ordering::SeqCst);
        self.send(SinkCommand::Play)?;
        self.start_watcher();
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.playing.store(false, Ordering::SeqCst);
        self.send(SinkCommand::Pause)
    }

    fn seek(&mut self, position_secs: f64) -> Result<()> {
        self.send(SinkCommand::Seek {
            position: Duration::from_secs_f64(position_secs.max(0.0)),
        })
    }

    fn set_volume(&mut self, volume: f32) {
        let _ = self.send(SinkCommand::SetVolume(volume.clamp(0.0, 1.0)));
    }

    fn set_rate(&mut self, rate: f32) {
        let _ = self.send(SinkCommand::SetRate(rate.max(0.1)));
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        let _ = self.send(SinkCommand::Stop);
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.cmd_tx.send(SinkCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Body of the dedicated audio thread
///
/// Owns the `OutputStream` and `Sink` for their entire lifetime; they never
/// cross thread boundaries.
fn audio_thread(
    cmd_rx: mpsc::Receiver<SinkCommand>,
    init_tx: mpsc::Sender<std::result::Result<(), String>>,
) {
    let (stream, stream_handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init_tx.send(Err(format!("failed to open audio output: {}", e)));
            return;
        }
    };
    // Keep the stream alive for the thread's lifetime
    let _stream = stream;

    if init_tx.send(Ok(())).is_err() {
        return;
    }

    let mut sink: Option<rodio::Sink> = None;
    let mut volume: f32 = 1.0;
    let mut rate: f32 = 1.0;

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            SinkCommand::Load { bytes, reply } => {
                if let Some(old) = sink.take() {
                    old.stop();
                }

                let outcome = rodio::Decoder::new(Cursor::new(bytes))
                    .map_err(|e| format!("decode failed: {}", e))
                    .and_then(|source| {
                        use rodio::Source;
                        let duration_secs = source
                            .total_duration()
                            .map(|d| d.as_secs_f64())
                            .unwrap_or(0.0);

                        let new_sink = rodio::Sink::try_new(&stream_handle)
                            .map_err(|e| format!("sink creation failed: {}", e))?;
                        new_sink.pause();
                        new_sink.set_volume(volume);
                        new_sink.set_speed(rate);
                        new_sink.append(source);
                        sink = Some(new_sink);
                        Ok(duration_secs)
                    });

                let _ = reply.send(outcome);
            }

            SinkCommand::Play => {
                if let Some(s) = &sink {
                    s.play();
                }
            }

            SinkCommand::Pause => {
                if let Some(s) = &sink {
                    s.pause();
                }
            }

            SinkCommand::Seek { position } => {
                if let Some(s) = &sink {
                    if let Err(e) = s.try_seek(position) {
                        warn!("seek to {:?} failed: {}", position, e);
                    }
                }
            }

            SinkCommand::SetVolume(v) => {
                volume = v;
                if let Some(s) = &sink {
                    s.set_volume(v);
                }
            }

            SinkCommand::SetRate(r) => {
                rate = r;
                if let Some(s) = &sink {
                    s.set_speed(r);
                }
            }

            SinkCommand::Position { reply } => {
                let _ = reply.send(sink.as_ref().map(|s| s.get_pos()));
            }

            SinkCommand::IsDrained { reply } => {
                let _ = reply.send(sink.as_ref().map(|s| s.empty()).unwrap_or(true));
            }

            SinkCommand::Stop => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
            }

            SinkCommand::Shutdown => break,
        }
    }

    debug!("Audio thread shutting down");
}
