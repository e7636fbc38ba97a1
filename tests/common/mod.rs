//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use synthetic_workload::config::{validate_config, ConfigStore, CpuConfig, MemoryConfig, WorkloadConfig};
use synthetic_workload::observability::metrics::init_metrics;
use synthetic_workload::{HttpServer, Shutdown};

/// Render a workload document in the YAML layout used in deployments.
pub fn yaml(error_rate: u32, min: u64, max: u64, usage: usize) -> String {
    format!(
        "errorRate: {error_rate}\ncpu:\n  minPrimesCalculated: {min}\n  maxPrimesCalculated: {max}\nmemory:\n  usage: {usage}\n"
    )
}

pub fn write_config(path: &Path, error_rate: u32, min: u64, max: u64, usage: usize) {
    std::fs::write(path, yaml(error_rate, min, max, usage)).unwrap();
}

pub fn workload(error_rate: u32, min: u64, max: u64, usage: usize) -> WorkloadConfig {
    WorkloadConfig {
        error_rate,
        cpu: CpuConfig {
            min_primes_calculated: min,
            max_primes_calculated: max,
        },
        memory: MemoryConfig { usage },
    }
}

pub fn store_with(error_rate: u32, min: u64, max: u64, usage: usize) -> Arc<ConfigStore> {
    let config = validate_config(workload(error_rate, min, max, usage)).unwrap();
    Arc::new(ConfigStore::with_config(config).unwrap())
}

/// Serve `store` on an ephemeral port.
pub async fn start_server(store: Arc<ConfigStore>) -> (SocketAddr, Shutdown) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(store, init_metrics());
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_for<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
