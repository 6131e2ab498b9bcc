//! Agent configuration: TOML file + environment + flag overrides.
//!
//! Layering (lowest to highest): built-in defaults, `config.toml`,
//! `NETPULSE_*` environment variables, CLI flags. Core never reads
//! config files -- this module hands it a finished `MonitorConfig`.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use netpulse_core::{MonitorConfig, SessionConfig, UplinkConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config struct ───────────────────────────────────────────────

/// On-disk agent configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Interface to sample; absent = aggregate across all interfaces.
    pub interface: Option<String>,

    /// Collector address (`host:port`); absent = no uplink.
    pub collector: Option<String>,

    /// Sampling cadence in milliseconds.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Uplink exchange cadence in milliseconds.
    #[serde(default = "default_exchange_interval_ms")]
    pub exchange_interval_ms: u64,

    /// Samples retained per history series.
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Connect and exchange deadline in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interface: None,
            collector: None,
            sample_interval_ms: default_sample_interval_ms(),
            exchange_interval_ms: default_exchange_interval_ms(),
            history_size: default_history_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_sample_interval_ms() -> u64 {
    1000
}
fn default_exchange_interval_ms() -> u64 {
    2000
}
fn default_history_size() -> usize {
    60
}
fn default_timeout_secs() -> u64 {
    5
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "netpulse", "netpulse").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netpulse");
    p
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the agent config from file + environment.
///
/// A missing file yields the defaults; a malformed file is an error.
pub fn load_config() -> Result<AgentConfig, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(AgentConfig::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("NETPULSE_"));

    Ok(figment.extract()?)
}

/// Resolve the effective `MonitorConfig` from file + env + CLI flags.
pub fn resolve_monitor_config(global: &GlobalOpts) -> Result<MonitorConfig, CliError> {
    Ok(merge(load_config()?, global))
}

/// Apply CLI flag overrides on top of the file/env configuration.
fn merge(file: AgentConfig, global: &GlobalOpts) -> MonitorConfig {
    let interface = global.interface.clone().or(file.interface);
    let sample_interval = Duration::from_millis(
        global.sample_interval_ms.unwrap_or(file.sample_interval_ms),
    );
    let history_size = global.history_size.unwrap_or(file.history_size);

    let timeout = Duration::from_secs(file.timeout_secs);
    let uplink = global
        .collector
        .clone()
        .or(file.collector)
        .map(|addr| UplinkConfig {
            addr,
            exchange_interval: Duration::from_millis(
                global
                    .exchange_interval_ms
                    .unwrap_or(file.exchange_interval_ms),
            ),
            session: SessionConfig {
                connect_timeout: timeout,
                exchange_timeout: timeout,
            },
        });

    MonitorConfig {
        interface,
        sample_interval,
        history_size,
        uplink,
        ..MonitorConfig::default()
    }
}
