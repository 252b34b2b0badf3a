//! Remote-control bridge
//!
//! Translates hardware/lock-screen transport events 1:1 into orchestrator
//! calls. Holds no state of its own; platform integrations feed events in
//! and the orchestrator does the rest.

use crate::error::Result;
use crate::playback::OrchestratorHandle;
use tracing::debug;

/// Hardware transport events
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    Play,
    Pause,
    Next,
    Previous,
    Seek { position_secs: f64 },
    Stop,
}

/// Stateless adapter from hardware events to orchestrator calls
pub struct RemoteControlBridge {
    handle: OrchestratorHandle,
}

impl RemoteControlBridge {
    pub fn new(handle: OrchestratorHandle) -> Self {
        Self { handle }
    }

    /// Dispatch one hardware event
    pub fn dispatch(&self, command: RemoteCommand) -> Result<()> {
        debug!("remote control event: {:?}", command);
        match command {
            RemoteCommand::Play => self.handle.play(),
            RemoteCommand::Pause => self.handle.pause(),
            RemoteCommand::Next => self.handle.skip_next(),
            RemoteCommand::Previous => self.handle.skip_previous(),
            RemoteCommand::Seek { position_secs } => self.handle.seek(position_secs),
            RemoteCommand::Stop => self.handle.stop(),
        }
    }
}
