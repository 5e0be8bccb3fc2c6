//! Error types for the data plane.

use std::io;

use tether_core::BackendId;

/// Errors raised while serving one inbound connection or the listener.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Listener or relay I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The active strategy had no backend to offer.
    #[error("no backend available")]
    NoBackend,

    /// Dialing the selected backend failed. No other backend is tried.
    #[error("backend {backend} unreachable: {source}")]
    BackendUnreachable {
        /// The backend that was selected.
        backend: BackendId,
        /// The dial error.
        #[source]
        source: io::Error,
    },
}

impl ProxyError {
    /// The message written back to the client before its connection is
    /// closed, if the client should get one.
    pub fn diagnostic(&self) -> Option<&'static str> {
        match self {
            ProxyError::NoBackend => Some("no backend available"),
            ProxyError::BackendUnreachable { .. } => Some("backend not available"),
            ProxyError::Io(_) => None,
        }
    }
}
