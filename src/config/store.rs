//! Shared runtime configuration.
//!
//! Readers take an `Arc<Snapshot>` without locking; the reload path builds a
//! complete replacement snapshot and swaps it in. A snapshot pairs the
//! configuration with the memory buffer sized for it, so a reader can never
//! see one without the other.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::config::schema::WorkloadConfig;
use crate::config::validation::ValidatedConfig;
use crate::observability::metrics;
use crate::workload::memory::{AllocationError, MemoryBuffer};

/// Immutable view of the published configuration.
#[derive(Debug)]
pub struct Snapshot {
    config: Option<WorkloadConfig>,
    buffer: Arc<MemoryBuffer>,
    generation: u64,
}

impl Snapshot {
    fn unconfigured() -> Self {
        Self {
            config: None,
            buffer: Arc::new(MemoryBuffer::empty()),
            generation: 0,
        }
    }

    /// The active configuration, or `None` before the first successful load.
    pub fn config(&self) -> Option<&WorkloadConfig> {
        self.config.as_ref()
    }

    pub fn buffer(&self) -> &MemoryBuffer {
        &self.buffer
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of successful applies that produced this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of publishing a new configuration.
#[derive(Debug, Clone)]
pub struct ReloadOutcome {
    pub generation: u64,
    pub buffer_reallocated: bool,
    pub config: WorkloadConfig,
}

/// Process-wide holder of the current snapshot.
///
/// Shared as `Arc<ConfigStore>` between the watcher and request handlers.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<Snapshot>,
    /// Serializes writers; readers never touch it.
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// A store with nothing applied yet.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::unconfigured()),
            write_lock: Mutex::new(()),
        }
    }

    /// A store with `config` already applied.
    pub fn with_config(config: ValidatedConfig) -> Result<Self, AllocationError> {
        let store = Self::new();
        store.apply(config)?;
        Ok(store)
    }

    /// Current snapshot. Holding it keeps its buffer alive across reloads.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Whether any configuration has been applied.
    pub fn is_configured(&self) -> bool {
        self.current.load().config.is_some()
    }

    /// Publish `config`.
    ///
    /// The buffer is only reallocated when `memory.usage` differs from the
    /// size of the buffer currently published; otherwise it is shared with
    /// the new snapshot. If the new buffer cannot be allocated nothing is
    /// published.
    pub fn apply(&self, config: ValidatedConfig) -> Result<ReloadOutcome, AllocationError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let previous = self.current.load_full();
        let usage = config.memory.usage;

        let buffer_reallocated = previous.buffer.len() != usage;
        let buffer = if buffer_reallocated {
            tracing::info!(bytes = usage, previous_bytes = previous.buffer.len(), "Allocating memory buffer");
            Arc::new(MemoryBuffer::allocate(usage)?)
        } else {
            Arc::clone(&previous.buffer)
        };

        let config = config.into_inner();
        let generation = previous.generation + 1;
        self.current.store(Arc::new(Snapshot {
            config: Some(config.clone()),
            buffer,
            generation,
        }));

        metrics::record_config_applied(generation, usage);

        Ok(ReloadOutcome {
            generation,
            buffer_reallocated,
            config,
        })
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
