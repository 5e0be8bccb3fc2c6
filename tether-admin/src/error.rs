//! Error types for the control plane.

use tether_core::{ParseBackendError, TopologyError};

/// Errors raised while applying a command.
///
/// A failed command leaves the topology and the active strategy as they were.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// The topology rejected the mutation.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// The control plane has already exited.
    #[error("control plane has exited")]
    Exited,

    /// The control-plane task is gone and no longer receives commands.
    #[error("control plane channel closed")]
    ChannelClosed,
}

/// Operator input that does not form a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCommandError {
    /// A known verb with missing arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// The backend argument is neither a port nor `host:port`.
    #[error("invalid backend: {0}")]
    InvalidBackend(#[from] ParseBackendError),

    /// An unrecognized verb.
    #[error("unknown command {0:?}; type 'help'")]
    Unknown(String),
}
