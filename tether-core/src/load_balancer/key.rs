//! Routing-key derivation for inbound connections.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::UnknownKeyMode;

/// How the data plane derives a routing key for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// A fresh UUID per connection. Spreads local test traffic that would
    /// otherwise all come from one loopback address.
    #[default]
    Random,
    /// The client's IP address, giving per-client affinity.
    ClientIp,
}

impl KeyMode {
    /// Derive the routing key for a connection from `peer`.
    pub fn derive(self, peer: SocketAddr) -> String {
        match self {
            KeyMode::Random => Uuid::new_v4().to_string(),
            KeyMode::ClientIp => peer.ip().to_string(),
        }
    }
}

impl fmt::Display for KeyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyMode::Random => "random",
            KeyMode::ClientIp => "client-ip",
        })
    }
}

impl FromStr for KeyMode {
    type Err = UnknownKeyMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" | "uuid" => Ok(KeyMode::Random),
            "client-ip" | "ip" => Ok(KeyMode::ClientIp),
            _ => Err(UnknownKeyMode(s.to_string())),
        }
    }
}
