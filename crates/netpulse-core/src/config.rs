// ── Runtime monitor configuration ──
//
// These types describe *how* the agent samples and reports.
// The CLI constructs them from its file/env/flag layering and hands
// them in -- core never reads config files.

use std::time::Duration;

use netpulse_proto::SessionConfig;

use crate::error::CoreError;

/// Sampling and history tuning for a [`Monitor`](crate::Monitor).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interface to sample; `None` aggregates across all interfaces.
    pub interface: Option<String>,

    /// Sampling cadence. Rates are derived over exactly this window.
    pub sample_interval: Duration,

    /// Number of samples the in-memory history retains per series.
    pub history_size: usize,

    /// Deadline for a single counter read (file or subprocess I/O).
    pub read_timeout: Duration,

    /// Collector reporting; `None` samples locally without an uplink.
    pub uplink: Option<UplinkConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interface: None,
            sample_interval: Duration::from_millis(1000),
            history_size: 60,
            read_timeout: Duration::from_secs(2),
            uplink: None,
        }
    }
}

impl MonitorConfig {
    /// Reject configurations the monitor cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.sample_interval.is_zero() {
            return Err(CoreError::Config {
                message: "sample_interval must be greater than zero".into(),
            });
        }
        if self.history_size == 0 {
            return Err(CoreError::Config {
                message: "history_size must be at least 1".into(),
            });
        }
        if let Some(uplink) = &self.uplink {
            if uplink.addr.is_empty() {
                return Err(CoreError::Config {
                    message: "collector address must not be empty".into(),
                });
            }
            if uplink.exchange_interval.is_zero() {
                return Err(CoreError::Config {
                    message: "exchange_interval must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

/// Collector reporting configuration.
///
/// The exchange cadence is independent of the sampling cadence: the
/// uplink pushes whatever sample is freshest when its own timer fires.
#[derive(Debug, Clone)]
pub struct UplinkConfig {
    /// Collector address, `host:port`.
    pub addr: String,

    /// How often to push the latest sample.
    pub exchange_interval: Duration,

    /// Transport timeouts for the session.
    pub session: SessionConfig,
}

impl UplinkConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            exchange_interval: Duration::from_millis(2000),
            session: SessionConfig::default(),
        }
    }
}
