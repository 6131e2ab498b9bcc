//! `run` command: sample continuously and stream to the collector.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Notify, watch};
use tracing::info;

use netpulse_core::{LinkState, Monitor, Sample, SampleListener};

use crate::cli::{GlobalOpts, RunArgs};
use crate::config;
use crate::error::CliError;
use crate::fmt;

/// Prints each published sample as one console line.
///
/// Runs on the sampler's task, so it only formats and writes a line;
/// the `[offline]` marker reflects the uplink state at print time.
struct ConsoleListener {
    quiet: bool,
    has_uplink: bool,
    link_state: watch::Receiver<LinkState>,
    emitted: AtomicU64,
    limit: Option<u64>,
    done: Arc<Notify>,
}

impl SampleListener for ConsoleListener {
    fn on_sample(&self, sample: &Sample) {
        if !self.quiet {
            let offline = self.has_uplink && *self.link_state.borrow() != LinkState::Connected;
            println!("{}", fmt::sample_line(sample, offline));
        }

        let emitted = self.emitted.fetch_add(1, Ordering::Relaxed) + 1;
        if self.limit.is_some_and(|limit| emitted >= limit) {
            self.done.notify_one();
        }
    }
}

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut monitor_config = config::resolve_monitor_config(global)?;
    if args.no_uplink {
        monitor_config.uplink = None;
    }

    let monitor = Monitor::new(monitor_config);
    let has_uplink = monitor.config().uplink.is_some();

    let done = Arc::new(Notify::new());
    monitor.subscribe(Arc::new(ConsoleListener {
        quiet: global.quiet,
        has_uplink,
        link_state: monitor.link_state(),
        emitted: AtomicU64::new(0),
        limit: args.count,
        done: Arc::clone(&done),
    }));

    monitor.start().await?;
    info!("sampling started; press Ctrl-C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received; stopping"),
        _ = done.notified() => {}
    }

    monitor.stop().await;
    Ok(())
}
