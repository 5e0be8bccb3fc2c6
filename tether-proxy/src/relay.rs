//! Byte relay between a client connection and its chosen backend.

use tokio::io::{copy_bidirectional, AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use tether_core::Backend;

use crate::error::ProxyError;

/// Bytes copied in each direction by a finished relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayStats {
    /// Client to backend.
    pub upstream: u64,
    /// Backend to client.
    pub downstream: u64,
}

/// Dial `backend` and copy bytes both ways until either side closes.
///
/// The payload is opaque. A dial failure is returned as
/// [`ProxyError::BackendUnreachable`] without touching `inbound`, so the
/// caller can still answer the client. No timeout is applied.
pub async fn relay<S>(inbound: &mut S, backend: &Backend) -> Result<RelayStats, ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = backend.id();
    let mut outbound = TcpStream::connect((id.host(), id.port()))
        .await
        .map_err(|source| ProxyError::BackendUnreachable {
            backend: id.clone(),
            source,
        })?;

    let total = backend.record_request();
    let _active = backend.track_active();
    debug!(backend = %id, requests = total, "relay established");

    let (upstream, downstream) = copy_bidirectional(inbound, &mut outbound).await?;
    Ok(RelayStats {
        upstream,
        downstream,
    })
}
