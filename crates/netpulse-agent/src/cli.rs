//! Clap derive structures for the `netpulse-agent` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netpulse-agent -- host bandwidth telemetry agent
#[derive(Debug, Parser)]
#[command(
    name = "netpulse-agent",
    version,
    about = "Sample host network throughput and stream it to a collector",
    long_about = "Samples network interface counters at a fixed cadence, derives\n\
        download/upload rates with link quality figures, and optionally streams\n\
        each sample to a netpulse collector over a persistent TCP connection.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Interface to sample (default: aggregate across all interfaces)
    #[arg(long, short = 'i', env = "NETPULSE_INTERFACE", global = true)]
    pub interface: Option<String>,

    /// Collector address, host:port (enables the uplink)
    #[arg(long, short = 'c', env = "NETPULSE_COLLECTOR", global = true)]
    pub collector: Option<String>,

    /// Sampling interval in milliseconds
    #[arg(long, env = "NETPULSE_SAMPLE_INTERVAL_MS", global = true)]
    pub sample_interval_ms: Option<u64>,

    /// Uplink exchange interval in milliseconds
    #[arg(long, env = "NETPULSE_EXCHANGE_INTERVAL_MS", global = true)]
    pub exchange_interval_ms: Option<u64>,

    /// Samples retained in the in-memory history window
    #[arg(long, env = "NETPULSE_HISTORY_SIZE", global = true)]
    pub history_size: Option<usize>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress per-sample console output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sample continuously and stream to the collector until Ctrl-C
    Run(RunArgs),

    /// List the network interfaces visible to the agent
    #[command(alias = "ls")]
    Interfaces,

    /// Manage agent configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── RUN ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Sample locally without a collector uplink, even if one is configured
    #[arg(long)]
    pub no_uplink: bool,

    /// Stop after this many samples (default: run until Ctrl-C)
    #[arg(long, short = 'n')]
    pub count: Option<u64>,
}

// ── CONFIG ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration as TOML
    Show,

    /// Print the config file path
    Path,
}

// ── COMPLETIONS ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
