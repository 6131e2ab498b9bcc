//! `netpulse-collector` -- standalone collector daemon.
//!
//! Binds a TCP listener, accepts agent uplink sessions, and acknowledges
//! every sample. Per-sample detail is logged at debug; an interval
//! summary reports how many agents are connected and how much telemetry
//! has arrived.

use std::time::Duration;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use netpulse_proto::{ClientRegistry, CollectorServer};

/// Collector daemon for netpulse agent telemetry.
#[derive(Parser, Debug)]
#[command(name = "netpulse-collector", version, about)]
struct Cli {
    /// Listen address, host:port
    #[arg(short = 'l', long, default_value = "0.0.0.0:9999", env = "NETPULSE_LISTEN")]
    listen: String,

    /// Seconds between telemetry summaries (0 disables them)
    #[arg(long, default_value_t = 30)]
    summary_interval_secs: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    // The daemon's whole job is reporting what arrives, so the default
    // level is info rather than the agent's warn.
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let server = CollectorServer::bind(&cli.listen)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to bind {}", cli.listen))?;

    let clients = server.clients();
    let cancel = CancellationToken::new();

    let server_task = tokio::spawn(server.run(cancel.clone()));
    let summary_task = (cli.summary_interval_secs > 0).then(|| {
        tokio::spawn(summary_loop(
            clients,
            Duration::from_secs(cli.summary_interval_secs),
            cancel.clone(),
        ))
    });

    tokio::signal::ctrl_c().await.into_diagnostic()?;
    info!("interrupt received; shutting down");

    cancel.cancel();
    let _ = server_task.await;
    if let Some(task) = summary_task {
        let _ = task.await;
    }
    Ok(())
}

/// Log a periodic one-line summary of connected agents and sample volume.
async fn summary_loop(clients: ClientRegistry, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let samples: u64 = clients.iter().map(|entry| entry.samples_received).sum();
                info!(agents = clients.len(), samples, "telemetry summary");
            }
        }
    }
}
