//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! workload document (YAML/TOML/JSON)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → ValidatedConfig
//!     → store.rs (atomic swap of Arc<Snapshot>, buffer resized if needed)
//!     → request handlers observe new snapshot
//!
//! On file change:
//!     watcher.rs detects modify / remove
//!     → loader.rs reloads into the store
//!     → failures keep the previous snapshot
//! ```
//!
//! settings.rs holds the process settings (CLI/env), which are fixed for the
//! lifetime of the process.

pub mod loader;
pub mod schema;
pub mod settings;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, ConfigFormat, ConfigLoader};
pub use schema::{CpuConfig, MemoryConfig, WorkloadConfig};
pub use settings::Settings;
pub use store::{ConfigStore, ReloadOutcome, Snapshot};
pub use validation::{validate_config, ValidatedConfig, ValidationError};
pub use watcher::{ConfigWatcher, WatchError, WatchSettings, WatchState, WatcherHandle};
