//! Commands accepted by the control plane.

use tokio::sync::mpsc;

use tether_core::{Backend, BackendId};

use crate::error::ControlError;

/// A discrete control-plane command.
///
/// Commands are the only way the topology or the strategy change.
#[derive(Debug)]
pub enum Command {
    /// Stop the control plane and signal shutdown.
    Exit,
    /// Append a backend to the topology.
    AddBackend(Backend),
    /// Remove the backend with this identity.
    RemoveBackend(BackendId),
    /// Switch to the named strategy. Unknown names fall back to
    /// consistent-hash.
    ChangeStrategy(String),
    /// Report the probe-set mapping under the active strategy.
    ShowMapping,
    /// Report the active strategy's view of the topology.
    ShowTopology,
}

impl Command {
    /// Short label used in reports and logs.
    pub fn label(&self) -> String {
        match self {
            Command::Exit => "EXIT".to_string(),
            Command::AddBackend(_) => "ADD".to_string(),
            Command::RemoveBackend(_) => "REMOVE".to_string(),
            Command::ChangeStrategy(name) => format!("STRATEGY:{name}"),
            Command::ShowMapping => "SHOW".to_string(),
            Command::ShowTopology => "TOPOLOGY".to_string(),
        }
    }
}

/// Sending side of the control-plane command channel.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ControlHandle {
    /// Create a command channel: the handle for producers and the receiver
    /// for [`ControlPlane::run`](crate::ControlPlane::run).
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a command behind every command sent before it.
    pub fn send(&self, command: Command) -> Result<(), ControlError> {
        self.tx.send(command).map_err(|_| ControlError::ChannelClosed)
    }
}
