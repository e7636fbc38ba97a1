//! Startup orchestration.
//!
//! # Order
//! 1. Settings (CLI/env) and logging
//! 2. Metrics recorder
//! 3. Config store + watcher (initial load, path registration)
//! 4. Listener bind, then serve
//!
//! Failing to create the file watcher or register the config path is always
//! fatal. A failed first load is fatal only under [`StartupPolicy::FailFast`].

use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::settings::Settings;
use crate::config::store::ConfigStore;
use crate::config::watcher::{ConfigWatcher, WatchError};
use crate::config::ConfigLoader;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics;

/// What to do when the very first configuration load fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StartupPolicy {
    /// Refuse to start.
    #[default]
    FailFast,
    /// Start anyway; the workload endpoint answers 503 until a valid
    /// configuration is loaded.
    Degrade,
}

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the service until a shutdown signal arrives.
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    let metrics_handle = metrics::init_metrics();
    let shutdown = Shutdown::new();

    let store = Arc::new(ConfigStore::new());
    let watcher = ConfigWatcher::new(ConfigLoader::new(&settings.config), Arc::clone(&store))
        .with_settings(settings.watch_settings())
        .with_startup_policy(settings.startup_policy)
        .spawn(shutdown.subscribe())?;

    let listener = TcpListener::bind(settings.bind)
        .await
        .map_err(|source| StartupError::Bind {
            address: settings.bind,
            source,
        })?;

    let upkeep = metrics::spawn_upkeep(
        metrics_handle.clone(),
        Duration::from_secs(5),
        shutdown.subscribe(),
    );

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let signal = signals::wait_for_signal().await;
        signal_shutdown.trigger(signal);
    });

    let server = HttpServer::new(store, metrics_handle)
        .with_request_timeout(Duration::from_secs(settings.request_timeout_secs));
    let served = server.run(listener, shutdown.subscribe()).await;

    // The server can also stop on its own (listener error); stop the rest either way.
    shutdown.trigger("server stopped");
    if let Err(e) = watcher.join().await {
        tracing::error!(error = %e, "Config watcher task failed");
    }
    let _ = upkeep.await;

    served.map_err(StartupError::Serve)
}
