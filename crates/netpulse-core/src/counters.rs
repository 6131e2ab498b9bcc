// ── Interface counter sources ──
//
// The sampler never knows how counters are obtained. Each platform
// mechanism (pseudo-file parsing on Linux, command invocation on
// Windows) lives behind this trait so it can be swapped -- and faked
// in tests -- without touching the sampling math.

pub mod netstat;
pub mod proc_net_dev;

use async_trait::async_trait;

use crate::error::CoreError;

/// Cumulative byte counters observed at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    /// Total bytes received since the counters were last reset.
    pub rx_bytes: u64,

    /// Total bytes transmitted since the counters were last reset.
    pub tx_bytes: u64,
}

/// Source of cumulative interface counters.
///
/// `&mut self` receivers keep implementations free to cache handles or
/// internal state; the sampler owns its source exclusively.
#[async_trait]
pub trait CounterSource: Send {
    /// Names of the interfaces this source can observe.
    async fn list_interfaces(&mut self) -> Result<Vec<String>, CoreError>;

    /// Read cumulative counters for one named interface, or aggregated
    /// across all of them when `interface` is `None`.
    ///
    /// Naming an interface the host does not have yields
    /// [`CoreError::UnknownInterface`]; the sampler degrades that to a
    /// zero-delta tick rather than crashing the loop.
    async fn read_counters(&mut self, interface: Option<&str>) -> Result<Counters, CoreError>;
}

/// The platform-default counter source.
#[cfg(windows)]
pub fn default_source() -> Box<dyn CounterSource> {
    Box::new(netstat::NetstatExec::new())
}

/// The platform-default counter source.
#[cfg(not(windows))]
pub fn default_source() -> Box<dyn CounterSource> {
    Box::new(proc_net_dev::ProcNetDev::new())
}
