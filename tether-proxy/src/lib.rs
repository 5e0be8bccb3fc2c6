//! Tether Proxy Engine
//!
//! The Tokio data plane that accepts client connections, routes each one
//! through the active strategy and relays bytes to the chosen backend, plus
//! the configuration and logging shared by the `tether` and `tether-backend`
//! binaries.

pub mod config;
pub mod demo;
pub mod error;
pub mod relay;
pub mod server;
pub mod telemetry;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use server::ProxyServer;
