//! Synthetic Workload Emulator
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                 SYNTHETIC WORKLOAD                    │
//!                    │                                                       │
//!  config file ──────┼─▶ watcher ──▶ loader ──▶ validation ──▶ store         │
//!  (modify/remove)   │                                          │  ArcSwap   │
//!                    │                                          ▼  snapshot  │
//!  Client Request ───┼─▶ request id ──▶ instrumentation ──▶ load generator   │
//!                    │                                     (cpu burn, fail?) │
//!  Client Response ◀─┼───────────── 200 JSON / 500 / 503 ◀──────┘            │
//!                    │                                                       │
//!  Prometheus ◀──────┼── /metrics                                            │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use synthetic_workload::config::Settings;
use synthetic_workload::lifecycle::startup;
use synthetic_workload::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::parse();
    logging::init_logging(settings.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?settings.config,
        bind_address = %settings.bind,
        startup_policy = ?settings.startup_policy,
        "synthetic-workload starting"
    );

    if let Err(e) = startup::run(settings).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
