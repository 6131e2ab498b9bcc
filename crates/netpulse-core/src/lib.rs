// netpulse-core: Sampling engine and monitor orchestration between netpulse-proto and consumers.

pub mod config;
pub mod counters;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod monitor;
pub mod probe;
mod sampler;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{MonitorConfig, UplinkConfig};
pub use counters::{CounterSource, Counters, default_source};
pub use dispatch::{Dispatcher, ListenerId, SampleListener};
pub use error::CoreError;
pub use history::HistoryWindow;
pub use monitor::{LinkState, Monitor};
pub use probe::{LinkQuality, QualityProbe, SyntheticProbe};

// Re-export the wire types consumers handle directly.
pub use netpulse_proto::{Sample, SessionConfig};
