//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use netpulse_core::CoreError;

/// Exit codes for process termination. Clap itself exits 2 on usage errors.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const COUNTERS: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(netpulse::config),
        help(
            "Check the config file and any NETPULSE_* environment variables.\n\
             Config file: {path}"
        )
    )]
    Config { message: String, path: String },

    #[error(transparent)]
    #[diagnostic(code(netpulse::config_file))]
    ConfigFile(Box<figment::Error>),

    // ── Counters ─────────────────────────────────────────────────────

    #[error("Unknown interface '{name}'")]
    #[diagnostic(
        code(netpulse::unknown_interface),
        help("Run: netpulse-agent interfaces to list the interfaces on this host")
    )]
    UnknownInterface { name: String },

    #[error("Could not read interface counters: {reason}")]
    #[diagnostic(
        code(netpulse::counter_read),
        help(
            "Check that /proc/net/dev is readable (Linux) or that netstat\n\
             and PowerShell are on PATH (Windows)."
        )
    )]
    CounterRead { reason: String },

    // ── Monitor ──────────────────────────────────────────────────────

    #[error("Monitor error: {0}")]
    #[diagnostic(code(netpulse::monitor))]
    Monitor(CoreError),

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::ConfigFile(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::ConfigFile(_) => exit_code::CONFIG,
            Self::UnknownInterface { .. } | Self::CounterRead { .. } => exit_code::COUNTERS,
            Self::Monitor(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownInterface { name } => CliError::UnknownInterface { name },

            CoreError::CounterRead { reason } => CliError::CounterRead { reason },

            CoreError::ReadTimeout { after } => CliError::CounterRead {
                reason: format!("timed out after {after:?}"),
            },

            CoreError::Config { message } => CliError::Config {
                message,
                path: crate::config::config_path().display().to_string(),
            },

            other => CliError::Monitor(other),
        }
    }
}
