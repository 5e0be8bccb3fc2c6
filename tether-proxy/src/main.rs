//! Tether Proxy Engine
//!
//! The main Tokio async engine: loads the configuration, starts the control
//! plane and the operator console, and runs the accept loop until an `exit`
//! command (or Ctrl-C) stops it.

#![deny(missing_docs)]

use anyhow::Result;
use clap::Parser;
use tokio::io::{stdin, stdout, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

use tether_admin::{console, Command, ControlHandle, ControlPlane};
use tether_core::ProbeSet;
use tether_proxy::{telemetry, ProxyConfig, ProxyServer};

/// The primary entrypoint for the Tether load balancer.
///
/// This initializes the multi-threaded Tokio runtime, loads the configuration,
/// and begins listening for incoming TCP connections.
#[tokio::main]
async fn main() -> Result<()> {
    let config = ProxyConfig::parse();
    telemetry::init(&config.log_level);

    let plane = ControlPlane::with_replicas(
        config.topology()?,
        config.strategy,
        ProbeSet::demo(),
        config.replicas,
    );
    let routing = plane.routing();

    let (handle, commands) = ControlHandle::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let control = tokio::spawn(plane.run(commands, shutdown_tx));

    if !config.no_console {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(err) = console::run(BufReader::new(stdin()), stdout(), handle).await {
                warn!(%err, "console failed");
            }
        });
    }

    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = handle.send(Command::Exit);
            }
        });
    }

    let server = ProxyServer::bind(config.listen, routing, config.key_mode)
        .await?
        .with_max_connections(config.max_connections);
    // Returns only after in-flight relays have drained.
    server.run(shutdown_rx).await?;

    control.await?;
    info!("shutting down gracefully");
    // The console may still be blocked reading stdin; don't wait for it.
    std::process::exit(0);
}
