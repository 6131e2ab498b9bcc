//! Agent-side transport session with explicit connection lifecycle.
//!
//! A [`TransportSession`] walks the states `Disconnected -> Connecting ->
//! Connected`, then alternates `Sending <-> AwaitingAck` inside each
//! [`exchange`](TransportSession::exchange) call. The state lives in an
//! `Option<Framed<..>>` and every operation takes `&mut self`, so a second
//! in-flight exchange on the same session is unrepresentable.
//!
//! # Example
//!
//! ```rust,ignore
//! use netpulse_proto::{Sample, SessionConfig, TransportSession};
//!
//! let mut session = TransportSession::new("127.0.0.1:9999", SessionConfig::default());
//! session.connect().await?;
//!
//! let ack = session.exchange(sample).await?;
//! assert_eq!(ack, sample); // collector echoes the record back
//!
//! session.close().await;
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use crate::codec::SampleCodec;
use crate::error::ProtoError;
use crate::sample::Sample;

// ── SessionConfig ────────────────────────────────────────────────────

/// Timeout tuning for collector connections.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for TCP connection establishment. Default: 5s.
    pub connect_timeout: Duration,

    /// Deadline for one full send + ack exchange. Default: 5s.
    pub exchange_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            exchange_timeout: Duration::from_secs(5),
        }
    }
}

// ── TransportSession ─────────────────────────────────────────────────

/// A persistent client connection to the collector.
///
/// Holds at most one TCP connection. On any exchange failure the
/// connection is torn down and the session returns to `Disconnected`;
/// the caller decides when to [`connect`](Self::connect) again.
pub struct TransportSession {
    addr: String,
    config: SessionConfig,
    conn: Option<Framed<TcpStream, SampleCodec>>,
}

impl TransportSession {
    /// Create a session for `addr` (`host:port`). Starts disconnected.
    pub fn new(addr: impl Into<String>, config: SessionConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            conn: None,
        }
    }

    /// The collector address this session targets.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Establish the TCP connection. No-op when already connected.
    ///
    /// On failure the session stays disconnected and the caller schedules
    /// the retry; this method never loops.
    pub async fn connect(&mut self) -> Result<(), ProtoError> {
        if self.conn.is_some() {
            return Ok(());
        }

        debug!(addr = %self.addr, "connecting to collector");
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ProtoError::Timeout {
                what: "connect",
                after: self.config.connect_timeout,
            })??;
        stream.set_nodelay(true)?;

        self.conn = Some(Framed::new(stream, SampleCodec));
        info!(addr = %self.addr, "collector connected");
        Ok(())
    }

    /// Send one sample and await its echoed acknowledgment.
    ///
    /// Any failure (I/O, decode, timeout, peer close) tears the connection
    /// down before returning: the sample is dropped, never requeued, and
    /// the session is `Disconnected` afterwards.
    pub async fn exchange(&mut self, sample: Sample) -> Result<Sample, ProtoError> {
        let conn = self.conn.as_mut().ok_or(ProtoError::NotConnected)?;

        let deadline = self.config.exchange_timeout;
        let result = match timeout(deadline, exchange_inner(conn, sample)).await {
            Ok(result) => result,
            Err(_) => Err(ProtoError::Timeout {
                what: "exchange",
                after: deadline,
            }),
        };

        if result.is_err() {
            // Connection state is unknown after a failed exchange.
            self.conn = None;
            debug!(addr = %self.addr, "session reset after failed exchange");
        }
        result
    }

    /// Tear down the connection. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let _ = conn.close().await;
            debug!(addr = %self.addr, "session closed");
        }
    }
}

/// One request/response cycle on an established connection.
async fn exchange_inner(
    conn: &mut Framed<TcpStream, SampleCodec>,
    sample: Sample,
) -> Result<Sample, ProtoError> {
    conn.send(sample).await?;

    match conn.next().await {
        Some(reply) => reply,
        None => Err(ProtoError::ConnectionClosed),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_session_config() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.exchange_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn exchange_before_connect_is_rejected() {
        let mut session = TransportSession::new("127.0.0.1:1", SessionConfig::default());
        let err = session
            .exchange(Sample::new(1.0, 1.0, 0, 0, 20, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtoError::NotConnected));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn close_when_disconnected_is_a_no_op() {
        let mut session = TransportSession::new("127.0.0.1:1", SessionConfig::default());
        session.close().await;
        session.close().await;
        assert!(!session.is_connected());
    }
}
