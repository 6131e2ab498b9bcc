// ── Sampling engine ──
//
// One tick: read counters, diff against the previous reading, derive
// KB/s rates, attach probe quality, store, publish. The first pass is a
// baseline that seeds the counters without emitting, so no consumer
// ever sees a delta measured from zero.

use std::sync::Arc;
use std::time::Duration;

use netpulse_proto::Sample;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::counters::{CounterSource, Counters};
use crate::dispatch::Dispatcher;
use crate::error::CoreError;
use crate::history::HistoryWindow;
use crate::probe::QualityProbe;

const BYTES_PER_KB: f64 = 1024.0;

/// Owns the per-tick sampling state. Driven by the monitor's timer task;
/// all state is mutated only from that task.
pub(crate) struct Sampler {
    source: Box<dyn CounterSource>,
    probe: Box<dyn QualityProbe>,
    history: Arc<HistoryWindow>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    read_timeout: Duration,
    interface: Option<String>,
    last: Counters,
}

impl Sampler {
    pub(crate) fn new(
        config: &MonitorConfig,
        interface: Option<String>,
        source: Box<dyn CounterSource>,
        probe: Box<dyn QualityProbe>,
        history: Arc<HistoryWindow>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            source,
            probe,
            history,
            dispatcher,
            interval: config.sample_interval,
            read_timeout: config.read_timeout,
            interface,
            last: Counters::default(),
        }
    }

    /// Seed the counter state without emitting a sample.
    ///
    /// A failed read seeds zeros; the next tick then reports the full
    /// cumulative totals instead of crashing the loop.
    pub(crate) async fn baseline(&mut self) {
        match self.read().await {
            Ok(counters) => {
                debug!(
                    rx = counters.rx_bytes,
                    tx = counters.tx_bytes,
                    "baseline counters seeded"
                );
                self.last = counters;
            }
            Err(e) => {
                warn!(error = %e, "baseline read failed; seeding zero counters");
                self.last = Counters::default();
            }
        }
    }

    /// Run one sampling pass and publish the result.
    ///
    /// A counter read failure degrades to a zero-delta sample (rates 0,
    /// totals carried over) rather than skipping the tick, so consumers
    /// keep a continuous series.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub(crate) async fn tick(&mut self) {
        let counters = match self.read().await {
            Ok(counters) => counters,
            Err(e) => {
                warn!(error = %e, "counter read failed; emitting zero-delta sample");
                self.last
            }
        };

        let interval_secs = self.interval.as_secs_f64();
        let delta_rx = counters.rx_bytes.saturating_sub(self.last.rx_bytes);
        let delta_tx = counters.tx_bytes.saturating_sub(self.last.tx_bytes);

        let download_kb_s = delta_rx as f64 / interval_secs / BYTES_PER_KB;
        let upload_kb_s = delta_tx as f64 / interval_secs / BYTES_PER_KB;

        let quality = self.probe.probe().await;
        let sample = Sample::new(
            download_kb_s,
            upload_kb_s,
            counters.rx_bytes / 1024,
            counters.tx_bytes / 1024,
            quality.latency_ms,
            quality.packet_loss_pct,
        );

        self.last = counters;

        self.history.append(&sample);
        self.dispatcher.publish(&sample);
    }

    /// Change the sampled interface. Takes effect on the next tick; the
    /// counter state is deliberately kept, matching a live filter switch
    /// (the next delta is clamped at zero if the new scope is smaller).
    pub(crate) fn set_interface(&mut self, interface: Option<String>) {
        if self.interface != interface {
            debug!(
                interface = interface.as_deref().unwrap_or("<all>"),
                "switching sampled interface"
            );
            self.interface = interface;
        }
    }

    async fn read(&mut self) -> Result<Counters, CoreError> {
        let read = self.source.read_counters(self.interface.as_deref());
        match timeout(self.read_timeout, read).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::ReadTimeout {
                after: self.read_timeout,
            }),
        }
    }
}
