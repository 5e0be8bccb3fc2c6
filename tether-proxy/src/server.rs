//! Server module for accepting client connections and routing them.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tether_core::{KeyMode, SharedRoutingTable};

use crate::error::ProxyError;
use crate::relay::relay;

/// The data-plane accept loop.
///
/// One task per accepted connection; each reads the routing table once to
/// pick a backend and then relays to it. On shutdown the loop stops
/// accepting and [`ProxyServer::run`] returns once in-flight relays have
/// drained.
#[derive(Debug)]
pub struct ProxyServer {
    listener: TcpListener,
    routing: SharedRoutingTable,
    key_mode: KeyMode,
    limit: Option<Arc<Semaphore>>,
}

impl ProxyServer {
    /// Bind the proxy on the given address.
    pub async fn bind(
        addr: SocketAddr,
        routing: SharedRoutingTable,
        key_mode: KeyMode,
    ) -> Result<Self, ProxyError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, routing, key_mode))
    }

    /// Serve on an already bound listener.
    pub fn from_listener(
        listener: TcpListener,
        routing: SharedRoutingTable,
        key_mode: KeyMode,
    ) -> Self {
        Self {
            listener,
            routing,
            key_mode,
            limit: None,
        }
    }

    /// Cap concurrently relayed connections. `None` leaves them unbounded.
    /// Connections past the cap wait in the accept loop for a slot.
    pub fn with_max_connections(mut self, max: Option<usize>) -> Self {
        self.limit = max.map(|max| Arc::new(Semaphore::new(max)));
        self
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, ProxyError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and route connections until `shutdown` turns true or its
    /// sender goes away, then wait for every in-flight relay to finish.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ProxyError> {
        info!(addr = %self.local_addr()?, key_mode = %self.key_mode, "LB listening");

        let mut relays = JoinSet::new();
        loop {
            if *shutdown.borrow() {
                break;
            }

            let permit = match &self.limit {
                Some(limit) => tokio::select! {
                    permit = limit.clone().acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                    _ = shutdown.changed() => break,
                },
                None => None,
            };

            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let routing = self.routing.clone();
                        let key_mode = self.key_mode;
                        relays.spawn(async move {
                            handle_connection(stream, peer, routing, key_mode).await;
                            drop(permit);
                        });
                    }
                    Err(err) => warn!(%err, "unable to accept connection"),
                },
                Some(joined) = relays.join_next(), if !relays.is_empty() => {
                    if let Err(err) = joined {
                        warn!(%err, "relay task failed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        info!(in_flight = relays.len(), "accept loop stopped, draining relays");
        while let Some(joined) = relays.join_next().await {
            if let Err(err) = joined {
                warn!(%err, "relay task failed");
            }
        }
        info!("relays drained");
        Ok(())
    }
}

async fn handle_connection(
    mut inbound: TcpStream,
    peer: SocketAddr,
    routing: SharedRoutingTable,
    key_mode: KeyMode,
) {
    let request_id = Uuid::new_v4();
    let key = key_mode.derive(peer);

    let Err(err) = route(&mut inbound, &routing, &key, request_id).await else {
        return;
    };
    match err.diagnostic() {
        Some(message) => {
            warn!(%request_id, %key, %err, "dropping connection");
            let _ = inbound.write_all(message.as_bytes()).await;
            let _ = inbound.shutdown().await;
        }
        None => debug!(%request_id, %err, "relay ended with error"),
    }
}

async fn route(
    inbound: &mut TcpStream,
    routing: &SharedRoutingTable,
    key: &str,
    request_id: Uuid,
) -> Result<(), ProxyError> {
    let backend = routing.select(key).ok_or(ProxyError::NoBackend)?;
    info!(%request_id, %key, backend = %backend.id(), "in-req");

    let stats = relay(inbound, &backend).await?;
    debug!(
        %request_id,
        upstream = stats.upstream,
        downstream = stats.downstream,
        "relay closed"
    );
    Ok(())
}
