//! Error types for the core library.

use crate::domain::backend::BackendId;

/// Errors raised when the topology rejects a mutation.
///
/// A rejected mutation leaves the topology untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// A backend with the same identity is already registered.
    #[error("backend {0} is already registered")]
    DuplicateBackend(BackendId),

    /// No backend with this identity is registered.
    #[error("no backend registered as {0}")]
    UnknownBackend(BackendId),
}

/// Errors raised when parsing a `"host:port"` backend identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseBackendError {
    /// The address has no `:port` suffix.
    #[error("missing port in backend address {0:?}")]
    MissingPort(String),

    /// The host part is empty.
    #[error("empty host in backend address {0:?}")]
    EmptyHost(String),

    /// The port is not a valid `u16`.
    #[error("invalid port in backend address {0:?}")]
    InvalidPort(String),
}

/// A strategy name that matches none of the known strategies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy {0:?} (expected round-robin, simple-hash, consistent-hash or static)")]
pub struct UnknownStrategy(pub String);

/// A key mode name that matches none of the known modes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key mode {0:?} (expected random or client-ip)")]
pub struct UnknownKeyMode(pub String);
