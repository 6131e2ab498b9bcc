use std::io;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `netpulse-proto` crate.
///
/// Covers every failure mode on the wire: connection establishment,
/// framing, and the per-sample request/response exchange.
/// `netpulse-core` maps these into domain-level diagnostics.
#[derive(Debug, Error)]
pub enum ProtoError {
    // ── Transport ───────────────────────────────────────────────────
    /// Underlying socket error (connection refused, reset, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A connect or exchange deadline expired.
    #[error("{what} timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },

    /// Operation requires an established connection.
    #[error("Not connected to collector")]
    NotConnected,

    /// Peer closed the connection before replying.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    // ── Framing ─────────────────────────────────────────────────────
    /// A frame failed to encode or decode.
    #[error("Malformed frame: {reason}")]
    Frame { reason: String },

    /// Incoming data exceeded the frame length guard without a delimiter.
    #[error("Frame of {len} bytes exceeds maximum of {max}")]
    FrameTooLong { len: usize, max: usize },
}

impl ProtoError {
    /// Returns `true` if this is a transient error worth retrying
    /// (typically by reconnecting and resuming on the next cycle).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock
            ),
            Self::Timeout { .. } | Self::NotConnected | Self::ConnectionClosed => true,
            Self::Frame { .. } | Self::FrameTooLong { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let refused = ProtoError::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(refused.is_transient());

        let timeout = ProtoError::Timeout {
            what: "exchange",
            after: Duration::from_secs(5),
        };
        assert!(timeout.is_transient());

        let malformed = ProtoError::Frame {
            reason: "expected value".into(),
        };
        assert!(!malformed.is_transient());
    }
}
