// ── Monitor lifecycle ──
//
// Full lifecycle management for host bandwidth monitoring. Owns the
// sampling task, the optional collector uplink task, and the observable
// link state; consumers attach through listeners and the history window.

use std::sync::Arc;

use netpulse_proto::TransportSession;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::counters::{CounterSource, default_source};
use crate::dispatch::{Dispatcher, ListenerId, SampleListener};
use crate::error::CoreError;
use crate::history::HistoryWindow;
use crate::probe::{QualityProbe, SyntheticProbe};
use crate::sampler::Sampler;

type Sources = (Box<dyn CounterSource>, Box<dyn QualityProbe>);

// ── LinkState ────────────────────────────────────────────────────────

/// Collector uplink state observable by consumers.
///
/// Stays [`Disconnected`](Self::Disconnected) for the lifetime of a
/// monitor configured without an uplink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

// ── Monitor ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Manages the sampling
/// lifecycle: periodic counter reads, history retention, listener
/// fan-out, and the optional collector uplink. One monitor runs once;
/// after [`stop`](Self::stop) it cannot be restarted.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    history: Arc<HistoryWindow>,
    dispatcher: Arc<Dispatcher>,
    link_state: watch::Sender<LinkState>,
    interface: watch::Sender<Option<String>>,
    cancel: CancellationToken,
    sources: Mutex<Option<Sources>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    /// Create a monitor with the platform counter source and the
    /// synthetic quality probe. Does NOT sample -- call
    /// [`start()`](Self::start) to spawn the background tasks.
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_sources(config, default_source(), Box::new(SyntheticProbe::new()))
    }

    /// Create a monitor with explicit counter and quality sources.
    pub fn with_sources(
        config: MonitorConfig,
        source: Box<dyn CounterSource>,
        probe: Box<dyn QualityProbe>,
    ) -> Self {
        let history = Arc::new(HistoryWindow::new(config.history_size));
        let (link_state, _) = watch::channel(LinkState::Disconnected);
        let (interface, _) = watch::channel(config.interface.clone());

        Self {
            inner: Arc::new(MonitorInner {
                config,
                history,
                dispatcher: Arc::new(Dispatcher::new()),
                link_state,
                interface,
                cancel: CancellationToken::new(),
                sources: Mutex::new(Some((source, probe))),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Validate the configuration and spawn the background tasks.
    ///
    /// The first sampling pass is a baseline that seeds counters
    /// without emitting, so the first published sample arrives one
    /// full interval after start.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Stopped);
        }
        self.inner.config.validate()?;

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            return Err(CoreError::AlreadyRunning);
        }
        let Some((source, probe)) = self.inner.sources.lock().await.take() else {
            return Err(CoreError::AlreadyRunning);
        };

        // Subscribe before reading the initial value so an interface
        // change racing with start() is never lost.
        let mut interface_rx = self.inner.interface.subscribe();
        let initial = interface_rx.borrow_and_update().clone();

        let sampler = Sampler::new(
            &self.inner.config,
            initial,
            source,
            probe,
            Arc::clone(&self.inner.history),
            Arc::clone(&self.inner.dispatcher),
        );

        handles.push(tokio::spawn(sampler_task(self.clone(), sampler, interface_rx)));
        if self.inner.config.uplink.is_some() {
            handles.push(tokio::spawn(uplink_task(self.clone())));
        }

        info!(
            interface = self.interface().as_deref().unwrap_or("<all>"),
            interval = ?self.inner.config.sample_interval,
            uplink = self.inner.config.uplink.is_some(),
            "monitor started"
        );
        Ok(())
    }

    /// Stop sampling and reporting.
    ///
    /// Cancels the background tasks and waits for them to finish; the
    /// uplink connection is closed on the way out. Idempotent.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        if handles.is_empty() {
            return;
        }
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("monitor stopped");
    }

    // ── Interface selection ──────────────────────────────────────

    /// Switch the sampled interface (`None` aggregates across all).
    ///
    /// Takes effect on the next sampling tick. The counter baseline is
    /// kept; a smaller scope simply clamps the next delta at zero.
    pub fn set_interface(&self, interface: Option<String>) {
        self.inner.interface.send_replace(interface);
    }

    /// The currently selected interface filter.
    pub fn interface(&self) -> Option<String> {
        self.inner.interface.borrow().clone()
    }

    // ── Sample fan-out ───────────────────────────────────────────

    /// Register a listener for every published sample.
    pub fn subscribe(&self, listener: Arc<dyn SampleListener>) -> ListenerId {
        self.inner.dispatcher.subscribe(listener)
    }

    /// Remove a previously registered listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.dispatcher.unsubscribe(id)
    }

    /// Access the rolling sample history.
    pub fn history(&self) -> Arc<HistoryWindow> {
        Arc::clone(&self.inner.history)
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to uplink state changes.
    pub fn link_state(&self) -> watch::Receiver<LinkState> {
        self.inner.link_state.subscribe()
    }

    /// The uplink state right now.
    pub fn current_link_state(&self) -> LinkState {
        *self.inner.link_state.borrow()
    }

    fn set_link_state(&self, state: LinkState) {
        let previous = self.inner.link_state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "link state changed");
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Baseline once, then sample on every interval tick until cancelled.
async fn sampler_task(
    monitor: Monitor,
    mut sampler: Sampler,
    mut interface_rx: watch::Receiver<Option<String>>,
) {
    let cancel = monitor.inner.cancel.clone();

    sampler.baseline().await;

    let mut interval = tokio::time::interval(monitor.inner.config.sample_interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if interface_rx.has_changed().unwrap_or(false) {
                    sampler.set_interface(interface_rx.borrow_and_update().clone());
                }
                sampler.tick().await;
            }
        }
    }

    debug!("sampler task stopped");
}

/// Push the freshest sample to the collector on the exchange cadence.
async fn uplink_task(monitor: Monitor) {
    let Some(uplink) = monitor.inner.config.uplink.clone() else {
        return;
    };

    let cancel = monitor.inner.cancel.clone();
    let cadence = uplink.exchange_interval;
    let mut session = TransportSession::new(uplink.addr, uplink.session);

    let mut interval = tokio::time::interval(cadence);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => exchange_cycle(&mut session, &monitor).await,
        }
    }

    session.close().await;
    monitor.set_link_state(LinkState::Disconnected);
    debug!("uplink task stopped");
}

/// One uplink cycle: ensure a connection, then push the latest sample.
///
/// A cycle with no sample yet pushes nothing. A failed exchange drops
/// the sample (never resent) and makes exactly one immediate reconnect
/// attempt; a failed connect waits for the next cycle.
async fn exchange_cycle(session: &mut TransportSession, monitor: &Monitor) {
    if !session.is_connected() {
        monitor.set_link_state(LinkState::Connecting);
        if let Err(e) = session.connect().await {
            warn!(error = %e, addr = session.addr(), "collector connect failed");
            monitor.set_link_state(LinkState::Disconnected);
            return;
        }
        info!(addr = session.addr(), "connected to collector");
        monitor.set_link_state(LinkState::Connected);
    }

    let Some(sample) = monitor.inner.history.latest() else {
        return;
    };

    match session.exchange(sample).await {
        Ok(ack) => {
            debug!(download_kb_s = ack.download_kb_s, "collector acknowledged sample");
        }
        Err(e) => {
            warn!(error = %e, "exchange failed; sample dropped");
            monitor.set_link_state(LinkState::Connecting);
            match session.connect().await {
                Ok(()) => {
                    info!(addr = session.addr(), "reconnected to collector");
                    monitor.set_link_state(LinkState::Connected);
                }
                Err(e) => {
                    warn!(error = %e, "reconnect failed; retrying next cycle");
                    monitor.set_link_state(LinkState::Disconnected);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::counters::Counters;
    use crate::probe::LinkQuality;
    use async_trait::async_trait;
    use netpulse_proto::{CollectorServer, Sample};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Counter source whose readings grow by a fixed step per read,
    /// recording the interface filter of every call.
    struct SteppingCounters {
        step: Counters,
        current: Counters,
        seen_filters: Arc<StdMutex<Vec<Option<String>>>>,
    }

    impl SteppingCounters {
        fn new(rx_step: u64, tx_step: u64) -> Self {
            Self {
                step: Counters {
                    rx_bytes: rx_step,
                    tx_bytes: tx_step,
                },
                current: Counters::default(),
                seen_filters: Arc::new(StdMutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl CounterSource for SteppingCounters {
        async fn list_interfaces(&mut self) -> Result<Vec<String>, CoreError> {
            Ok(vec!["eth0".into()])
        }

        async fn read_counters(
            &mut self,
            interface: Option<&str>,
        ) -> Result<Counters, CoreError> {
            self.seen_filters
                .lock()
                .unwrap()
                .push(interface.map(String::from));
            self.current.rx_bytes += self.step.rx_bytes;
            self.current.tx_bytes += self.step.tx_bytes;
            Ok(self.current)
        }
    }

    struct FixedProbe;

    #[async_trait]
    impl QualityProbe for FixedProbe {
        async fn probe(&mut self) -> LinkQuality {
            LinkQuality {
                latency_ms: 25,
                packet_loss_pct: 0,
            }
        }
    }

    struct Recorder(Arc<StdMutex<Vec<Sample>>>);

    impl SampleListener for Recorder {
        fn on_sample(&self, sample: &Sample) {
            self.0.lock().unwrap().push(*sample);
        }
    }

    fn monitor_with(config: MonitorConfig) -> (Monitor, Arc<StdMutex<Vec<Sample>>>) {
        let monitor = Monitor::with_sources(
            config,
            Box::new(SteppingCounters::new(102_400, 51_200)),
            Box::new(FixedProbe),
        );
        let collected = Arc::new(StdMutex::new(Vec::new()));
        monitor.subscribe(Arc::new(Recorder(Arc::clone(&collected))));
        (monitor, collected)
    }

    #[tokio::test(start_paused = true)]
    async fn emits_samples_on_the_sampling_cadence() {
        let (monitor, collected) = monitor_with(MonitorConfig::default());

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        monitor.stop().await;

        let samples = collected.lock().unwrap();
        assert_eq!(samples.len(), 3, "one sample per elapsed interval");
        for sample in samples.iter() {
            assert!((sample.download_kb_s - 100.0).abs() < 1e-9);
            assert!((sample.upload_kb_s - 50.0).abs() < 1e-9);
            assert_eq!(sample.latency_ms, 25);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interface_switch_takes_effect_on_the_next_tick() {
        let source = SteppingCounters::new(1024, 1024);
        let seen_filters = Arc::clone(&source.seen_filters);
        let monitor = Monitor::with_sources(
            MonitorConfig::default(),
            Box::new(source),
            Box::new(FixedProbe),
        );

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        monitor.set_interface(Some("eth0".into()));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        monitor.stop().await;

        let filters = seen_filters.lock().unwrap();
        assert_eq!(
            *filters,
            vec![None, None, Some("eth0".to_string())],
            "baseline and first tick unfiltered, second tick filtered"
        );
        assert_eq!(monitor.interface(), Some("eth0".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_is_rejected() {
        let (monitor, _) = monitor_with(MonitorConfig::default());

        monitor.start().await.unwrap();
        assert!(matches!(
            monitor.start().await,
            Err(CoreError::AlreadyRunning)
        ));
        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_restart_is_refused() {
        let (monitor, _) = monitor_with(MonitorConfig::default());

        monitor.start().await.unwrap();
        monitor.stop().await;
        monitor.stop().await;

        assert!(matches!(monitor.start().await, Err(CoreError::Stopped)));
    }

    #[tokio::test]
    async fn invalid_config_fails_start() {
        let config = MonitorConfig {
            sample_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        let (monitor, _) = monitor_with(config);

        assert!(matches!(
            monitor.start().await,
            Err(CoreError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn link_state_stays_disconnected_without_uplink() {
        let (monitor, _) = monitor_with(MonitorConfig::default());
        assert_eq!(monitor.current_link_state(), LinkState::Disconnected);

        monitor.start().await.unwrap();
        monitor.stop().await;
        assert_eq!(monitor.current_link_state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn uplink_reports_latest_sample_to_collector() {
        let collector = CollectorServer::bind("127.0.0.1:0").await.unwrap();
        let addr = collector.local_addr().unwrap();
        let clients = collector.clients();
        let collector_cancel = CancellationToken::new();
        tokio::spawn(collector.run(collector_cancel.clone()));

        let mut uplink = crate::config::UplinkConfig::new(addr.to_string());
        uplink.exchange_interval = Duration::from_millis(50);
        let config = MonitorConfig {
            sample_interval: Duration::from_millis(20),
            uplink: Some(uplink),
            ..MonitorConfig::default()
        };
        let (monitor, _) = monitor_with(config);
        monitor.start().await.unwrap();

        // Wait for the uplink to connect.
        let mut link = monitor.link_state();
        tokio::time::timeout(Duration::from_secs(5), async {
            while *link.borrow_and_update() != LinkState::Connected {
                link.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        // The collector should see samples flowing from this host.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let seen = clients
                    .get("127.0.0.1")
                    .map(|entry| entry.samples_received)
                    .unwrap_or(0);
                if seen >= 2 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        monitor.stop().await;
        assert_eq!(monitor.current_link_state(), LinkState::Disconnected);
        collector_cancel.cancel();
    }
}
