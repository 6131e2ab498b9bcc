// ── Telemetry sample ──
//
// The single record type that crosses the wire. The agent builds one per
// sampling tick; the collector echoes the identical record back as the
// acknowledgment, so this type is both request and reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bandwidth measurement from an agent.
///
/// Rates are instantaneous over the last sampling interval; totals are
/// cumulative since the counters were last reset. Serialized as JSON with
/// the timestamp in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Download rate over the last interval, in KB/s.
    pub download_kb_s: f64,

    /// Upload rate over the last interval, in KB/s.
    pub upload_kb_s: f64,

    /// Cumulative bytes received, converted to KB.
    pub total_downloaded_kb: u64,

    /// Cumulative bytes sent, converted to KB.
    pub total_uploaded_kb: u64,

    /// Round-trip latency estimate in milliseconds.
    pub latency_ms: u32,

    /// Packet loss estimate, 0..=100 percent.
    pub packet_loss_pct: u8,

    /// When the sample was taken. Assigned at construction, never mutated.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Build a sample stamped with the current time.
    ///
    /// Negative rates are clamped to zero -- the sampler already clamps
    /// counter resets, this backstops any other caller.
    pub fn new(
        download_kb_s: f64,
        upload_kb_s: f64,
        total_downloaded_kb: u64,
        total_uploaded_kb: u64,
        latency_ms: u32,
        packet_loss_pct: u8,
    ) -> Self {
        let now = Utc::now();
        // Wire resolution is milliseconds; truncate up front so an echoed
        // sample compares equal to the original.
        let timestamp = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);

        Self {
            download_kb_s: download_kb_s.max(0.0),
            upload_kb_s: upload_kb_s.max(0.0),
            total_downloaded_kb,
            total_uploaded_kb,
            latency_ms,
            packet_loss_pct: packet_loss_pct.min(100),
            timestamp,
        }
    }
}
