//! Demo backend for trying Tether locally.
//!
//! Run a few on consecutive ports, then point `tether` at them:
//!
//! ```text
//! tether-backend --port 8081 & tether-backend --port 8082 &
//! ```

use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;

use tether_proxy::{demo, telemetry};

/// Demo HTTP backend that names its port in every response.
#[derive(Debug, Parser)]
#[command(name = "tether-backend")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 8081)]
    port: u16,

    /// Log filter directive, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(&args.log_level);

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], args.port))).await?;
    demo::serve(listener).await?;
    Ok(())
}
