// ── Core error types ──
//
// Domain-level errors from netpulse-core. Wire-level failures from
// netpulse-proto are wrapped in `Uplink` rather than exposed raw;
// the agent maps these into user-facing diagnostics.

use std::time::Duration;

use netpulse_proto::ProtoError;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Sampling errors ──────────────────────────────────────────────
    #[error("Counter read failed: {reason}")]
    CounterRead { reason: String },

    #[error("Unknown interface: {name}")]
    UnknownInterface { name: String },

    #[error("Counter read timed out after {after:?}")]
    ReadTimeout { after: Duration },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Monitor is already running")]
    AlreadyRunning,

    #[error("Monitor has been stopped and cannot be restarted")]
    Stopped,

    // ── Uplink errors ────────────────────────────────────────────────
    #[error("Uplink error: {0}")]
    Uplink(#[from] ProtoError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}
