//! Backend server models.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ParseBackendError;

/// The identity of a backend server, rendered as `"host:port"`.
///
/// This string form is also the hashing input for every strategy, so two
/// backends with the same host and port always land on the same positions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackendId {
    host: String,
    port: u16,
}

impl BackendId {
    /// Create an identity from a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Shorthand for `localhost:<port>`, the address of the demo backends.
    pub fn localhost(port: u16) -> Self {
        Self::new("localhost", port)
    }

    /// The host part.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port part.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for BackendId {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseBackendError::MissingPort(s.to_string()))?;
        // Accept "[::1]:8081" for IPv6 hosts.
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(ParseBackendError::EmptyHost(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ParseBackendError::InvalidPort(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

/// Represents a single upstream backend server.
///
/// Equality is identity equality: counters and the health flag are ignored.
#[derive(Debug)]
pub struct Backend {
    id: BackendId,
    /// Reserved; routing never consults it.
    healthy: AtomicBool,
    /// Relayed connections since the backend was registered.
    requests: AtomicU64,
    /// Relays currently in flight.
    active: AtomicU64,
}

impl Backend {
    /// Create a new backend, assumed healthy.
    pub fn new(id: BackendId) -> Self {
        Self {
            id,
            healthy: AtomicBool::new(true),
            requests: AtomicU64::new(0),
            active: AtomicU64::new(0),
        }
    }

    /// The backend's identity.
    pub fn id(&self) -> &BackendId {
        &self.id
    }

    /// Check if the backend is marked healthy
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Update the health status of the backend
    pub fn set_healthy(&self, is_healthy: bool) {
        self.healthy.store(is_healthy, Ordering::Release);
    }

    /// Count one more relayed connection and return the new total.
    pub fn record_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Total relayed connections.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Relays currently in flight.
    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    /// Increment the in-flight counter and return a guard
    /// that will decrement it when dropped.
    pub fn track_active(&self) -> ActiveConnectionGuard<'_> {
        self.active.fetch_add(1, Ordering::Relaxed);
        ActiveConnectionGuard { backend: self }
    }
}

impl PartialEq for Backend {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Backend {}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

/// A RAII guard that decrements a backend's in-flight counter when the relay
/// finishes and drops the guard.
pub struct ActiveConnectionGuard<'a> {
    backend: &'a Backend,
}

impl<'a> Drop for ActiveConnectionGuard<'a> {
    fn drop(&mut self) {
        self.backend.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A thread-safe reference to a Backend.
pub type SharedBackend = Arc<Backend>;
