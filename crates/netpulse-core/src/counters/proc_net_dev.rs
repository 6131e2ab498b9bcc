// ── /proc/net/dev counter source ──

use std::path::PathBuf;

use async_trait::async_trait;

use super::{CounterSource, Counters};
use crate::error::CoreError;

const PROC_NET_DEV: &str = "/proc/net/dev";

/// Reads cumulative counters from the kernel's `/proc/net/dev` table.
pub struct ProcNetDev {
    path: PathBuf,
}

impl ProcNetDev {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(PROC_NET_DEV),
        }
    }

    /// Read from an alternate path. Used by tests with fixture files.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_table(&self) -> Result<String, CoreError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CoreError::CounterRead {
                reason: format!("{}: {e}", self.path.display()),
            })
    }
}

impl Default for ProcNetDev {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterSource for ProcNetDev {
    async fn list_interfaces(&mut self) -> Result<Vec<String>, CoreError> {
        let raw = self.read_table().await?;
        Ok(parse_interfaces(&raw))
    }

    async fn read_counters(&mut self, interface: Option<&str>) -> Result<Counters, CoreError> {
        let raw = self.read_table().await?;
        aggregate(&raw, interface)
    }
}

/// Interface names from the table body, in kernel order.
fn parse_interfaces(raw: &str) -> Vec<String> {
    raw.lines()
        .skip(2)
        .filter_map(|line| {
            line.split_whitespace()
                .next()
                .map(|name| name.trim_end_matches(':').to_string())
        })
        .collect()
}

/// Sum the rx/tx byte columns, optionally filtered to one interface.
///
/// Table layout: two header lines, then one line per interface of
/// `name: <16 counters>` where received bytes is the first counter and
/// transmitted bytes the ninth.
fn aggregate(raw: &str, interface: Option<&str>) -> Result<Counters, CoreError> {
    let mut rx: u64 = 0;
    let mut tx: u64 = 0;
    let mut matched = false;

    for line in raw.lines().skip(2) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            continue;
        }

        let name = parts[0].trim_end_matches(':');
        match interface {
            Some(wanted) if name != wanted => continue,
            _ => {}
        }
        matched = true;

        rx = rx.saturating_add(parts[1].parse().unwrap_or(0));
        tx = tx.saturating_add(parts[9].parse().unwrap_or(0));
    }

    match interface {
        Some(name) if !matched => Err(CoreError::UnknownInterface {
            name: name.to_string(),
        }),
        _ => Ok(Counters {
            rx_bytes: rx,
            tx_bytes: tx,
        }),
    }
}
