//! Synthetic Workload Emulator Library
//!
//! An HTTP service that burns a configurable amount of CPU and memory per
//! request and fails a configurable share of requests. The configuration is
//! reloaded live from a file watched on disk.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod workload;

pub use config::{ConfigLoader, ConfigStore, ConfigWatcher, Settings, WorkloadConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use workload::LoadGenerator;
