//! Process settings.
//!
//! Read once at startup from the command line, falling back to environment
//! variables. Unlike the workload document these never change while running.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::watcher::WatchSettings;
use crate::lifecycle::startup::StartupPolicy;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Synthetic workload emulator settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "synthetic-workload")]
#[command(about = "HTTP service that burns configurable CPU and memory per request", long_about = None)]
#[command(version)]
pub struct Settings {
    /// Path of the workload document (YAML, or TOML/JSON by extension)
    #[arg(short, long, env = "CONFIG_FILE_PATH")]
    pub config: PathBuf,

    /// Address to serve on
    #[arg(short, long, env = "WORKLOAD_BIND_ADDRESS", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Behavior when the first configuration load fails
    #[arg(long, env = "WORKLOAD_STARTUP_POLICY", value_enum, default_value_t = StartupPolicy::FailFast)]
    pub startup_policy: StartupPolicy,

    /// Per-request timeout applied by the HTTP layer
    #[arg(long, env = "WORKLOAD_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Retry interval while the config file is missing
    #[arg(long, env = "WORKLOAD_REARM_INTERVAL_MS", default_value_t = 1000)]
    pub rearm_interval_ms: u64,

    /// Log output format
    #[arg(long, env = "WORKLOAD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Settings {
    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings {
            rearm_interval: Duration::from_millis(self.rearm_interval_ms.max(1)),
            ..WatchSettings::default()
        }
    }
}
