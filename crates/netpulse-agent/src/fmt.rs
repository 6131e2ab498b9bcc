//! Human-readable rate and size formatting for console output.

use netpulse_core::Sample;

/// Format a KB/s rate as a compact human-readable string.
pub fn fmt_rate(kb_per_sec: f64) -> String {
    if kb_per_sec >= 1024.0 * 1024.0 {
        format!("{:.1} GB/s", kb_per_sec / (1024.0 * 1024.0))
    } else if kb_per_sec >= 1024.0 {
        format!("{:.1} MB/s", kb_per_sec / 1024.0)
    } else {
        format!("{kb_per_sec:.1} KB/s")
    }
}

/// Format a cumulative KB total as a compact human-readable string.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn fmt_total(kb: u64) -> String {
    if kb >= 1024 * 1024 {
        format!("{:.1}G", kb as f64 / (1024.0 * 1024.0))
    } else if kb >= 1024 {
        format!("{:.1}M", kb as f64 / 1024.0)
    } else {
        format!("{kb}K")
    }
}

/// Render one sample as a console line.
///
/// `offline` appends a marker so a watcher can tell at a glance that
/// samples are no longer reaching the collector.
pub fn sample_line(sample: &Sample, offline: bool) -> String {
    let marker = if offline { "  [offline]" } else { "" };
    format!(
        "{}  down {:>10}  up {:>10}  total {}/{}  lat {:>3} ms  loss {}%{}",
        sample.timestamp.format("%H:%M:%S"),
        fmt_rate(sample.download_kb_s),
        fmt_rate(sample.upload_kb_s),
        fmt_total(sample.total_downloaded_kb),
        fmt_total(sample.total_uploaded_kb),
        sample.latency_ms,
        sample.packet_loss_pct,
        marker,
    )
}
