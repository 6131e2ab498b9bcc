//! Central collector: accepts agent connections and echoes every sample
//! back as its acknowledgment.
//!
//! Each accepted connection gets its own task running the decode -> log ->
//! echo loop until the peer disconnects or sends a malformed frame. A
//! connection registry keyed by the peer IP tracks who is reporting;
//! it is bookkeeping only and never affects delivery.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::SampleCodec;
use crate::error::ProtoError;

// ── Registry ─────────────────────────────────────────────────────────

/// Registry entry for one connected agent.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    /// Remote socket address of the active connection.
    pub addr: SocketAddr,

    /// When this connection was accepted.
    pub connected_at: DateTime<Utc>,

    /// Samples received on this connection so far.
    pub samples_received: u64,
}

/// Shared registry of connected agents, keyed by remote IP.
///
/// One logical agent per host: a second connection from the same IP
/// overwrites the entry (last writer wins).
pub type ClientRegistry = Arc<DashMap<String, ClientEntry>>;

// ── CollectorServer ──────────────────────────────────────────────────

/// TCP server that receives and acknowledges agent samples.
pub struct CollectorServer {
    listener: TcpListener,
    clients: ClientRegistry,
}

impl CollectorServer {
    /// Bind the listen socket.
    ///
    /// This is the collector's only fatal startup step -- callers should
    /// treat an error here as terminal.
    pub async fn bind(addr: &str) -> Result<Self, ProtoError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "collector listening");

        Ok(Self {
            listener,
            clients: Arc::new(DashMap::new()),
        })
    }

    /// The bound local address. Useful with a `:0` bind in tests.
    pub fn local_addr(&self) -> Result<SocketAddr, ProtoError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the registry, shared with all connection tasks.
    pub fn clients(&self) -> ClientRegistry {
        Arc::clone(&self.clients)
    }

    /// Accept connections until `cancel` fires.
    ///
    /// Accept errors are logged and the loop keeps serving; a failed
    /// handler never takes the server (or its sibling connections) down.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let clients = Arc::clone(&self.clients);
                            let conn_cancel = cancel.child_token();
                            tokio::spawn(async move {
                                handle_connection(stream, peer, clients, conn_cancel).await;
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                        }
                    }
                }
            }
        }

        info!("collector shutting down");
    }
}

// ── Per-connection handler ───────────────────────────────────────────

/// Serve one agent: decode a sample, log it, echo it back, repeat.
///
/// Exits on peer close, malformed frame, or cancellation. Only removes
/// its own registry entry -- if a newer connection from the same IP has
/// already replaced it, that entry is left alone.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    clients: ClientRegistry,
    cancel: CancellationToken,
) {
    let key = peer.ip().to_string();
    clients.insert(
        key.clone(),
        ClientEntry {
            addr: peer,
            connected_at: Utc::now(),
            samples_received: 0,
        },
    );
    info!(peer = %peer, active = clients.len(), "agent connected");

    let mut framed = Framed::new(stream, SampleCodec);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = framed.next() => {
                match frame {
                    Some(Ok(sample)) => {
                        debug!(
                            peer = %peer,
                            down_kb_s = sample.download_kb_s,
                            up_kb_s = sample.upload_kb_s,
                            latency_ms = sample.latency_ms,
                            loss_pct = sample.packet_loss_pct,
                            "sample received"
                        );

                        if let Some(mut entry) = clients.get_mut(&key) {
                            entry.samples_received += 1;
                        }

                        if let Err(e) = framed.send(sample).await {
                            warn!(peer = %peer, error = %e, "echo failed");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(peer = %peer, error = %e, "bad frame from agent");
                        break;
                    }
                    None => {
                        debug!(peer = %peer, "agent closed connection");
                        break;
                    }
                }
            }
        }
    }

    if let Some((_, entry)) = clients.remove_if(&key, |_, entry| entry.addr == peer) {
        let session_secs = (Utc::now() - entry.connected_at).num_seconds();
        info!(
            peer = %peer,
            session_secs,
            samples = entry.samples_received,
            active = clients.len(),
            "agent disconnected"
        );
    } else {
        // A newer connection from this IP owns the entry now.
        info!(peer = %peer, active = clients.len(), "agent disconnected");
    }
}
