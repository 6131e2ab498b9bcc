// ── netstat counter source (Windows) ──
//
// Shells out to `netstat -e` for the machine-wide byte totals and to
// PowerShell's `Get-NetAdapter` for adapter names. `netstat -e` only
// exposes an aggregate statistics table, so a named interface is
// validated against the adapter list and then sampled machine-wide.

use async_trait::async_trait;
use tokio::process::Command;

use super::{CounterSource, Counters};
use crate::error::CoreError;

/// Reads counters by invoking the platform's diagnostic commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetstatExec;

impl NetstatExec {
    pub fn new() -> Self {
        Self
    }

    async fn run(program: &str, args: &[&str]) -> Result<String, CoreError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| CoreError::CounterRead {
                reason: format!("{program}: {e}"),
            })?;

        if !output.status.success() {
            return Err(CoreError::CounterRead {
                reason: format!("{program} exited with {}", output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl CounterSource for NetstatExec {
    async fn list_interfaces(&mut self) -> Result<Vec<String>, CoreError> {
        let raw = Self::run(
            "powershell",
            &[
                "-NoProfile",
                "-Command",
                "Get-NetAdapter | Select-Object -ExpandProperty Name",
            ],
        )
        .await?;
        Ok(parse_adapter_names(&raw))
    }

    async fn read_counters(&mut self, interface: Option<&str>) -> Result<Counters, CoreError> {
        if let Some(name) = interface {
            let known = self.list_interfaces().await?;
            if !known.iter().any(|n| n == name) {
                return Err(CoreError::UnknownInterface {
                    name: name.to_string(),
                });
            }
        }

        let raw = Self::run("netstat", &["-e"]).await?;
        parse_netstat_e(&raw)
    }
}

/// Pull the `Bytes <rx> <tx>` row out of `netstat -e` output.
fn parse_netstat_e(raw: &str) -> Result<Counters, CoreError> {
    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("Bytes") {
            continue;
        }

        let rx: Option<u64> = parts.next().and_then(|v| v.parse().ok());
        let tx: Option<u64> = parts.next().and_then(|v| v.parse().ok());
        if let (Some(rx_bytes), Some(tx_bytes)) = (rx, tx) {
            return Ok(Counters { rx_bytes, tx_bytes });
        }
    }

    Err(CoreError::CounterRead {
        reason: "no Bytes row in netstat -e output".into(),
    })
}

fn parse_adapter_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
