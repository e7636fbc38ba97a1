//! Per-request load shaping.
//!
//! # Data Flow
//! ```text
//! request
//!     → ConfigStore::snapshot()
//!     → num_primes() draws a cost in [min, max)
//!     → cpu::burn(cost) on the blocking pool
//!     → should_fail() draws against errorRate
//!     → Outcome
//! ```
//!
//! The failure draw happens after the burn, so a failing request still pays
//! its CPU cost.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinError;

use crate::config::schema::CpuConfig;
use crate::config::store::ConfigStore;
use crate::observability::metrics;
use crate::workload::cpu;

/// Message carried by every successful response.
pub const GREETING: &str = "Hello world!";

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadResponse {
    pub message: String,
    /// The CPU cost used for this request.
    pub duration: u64,
}

/// What a request turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(WorkloadResponse),
    /// The configured error rate selected this request to fail.
    SimulatedFailure { cost: u64 },
    /// The CPU burn did not run to completion.
    BurnFailed { cost: u64 },
    /// No configuration has been applied yet.
    Unconfigured,
}

/// Draw a CPU cost in `[min, max)`.
///
/// Inverted or empty bounds yield `min`; validation keeps them out of the store.
pub fn num_primes(cpu: &CpuConfig, rng: &mut fastrand::Rng) -> u64 {
    let span = cpu.span();
    if span == 0 {
        return cpu.min_primes_calculated;
    }
    cpu.min_primes_calculated + rng.u64(0..span)
}

/// Draw `r` in `[0, 100)` and fail when `r < error_rate`.
pub fn should_fail(error_rate: u32, rng: &mut fastrand::Rng) -> bool {
    rng.u32(0..100) < error_rate
}

/// Turns requests into synthetic CPU load.
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    store: Arc<ConfigStore>,
}

impl LoadGenerator {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Run one request against the current snapshot.
    ///
    /// A reload that lands while this runs does not affect it.
    pub async fn handle(&self) -> Outcome {
        let snapshot = self.store.snapshot();
        let Some(config) = snapshot.config() else {
            tracing::warn!("Request received before any configuration was loaded");
            return Outcome::Unconfigured;
        };

        let mut rng = fastrand::Rng::new();
        let cost = num_primes(&config.cpu, &mut rng);
        tracing::debug!(cost, generation = snapshot.generation(), "Calculating primes");

        let burned = tokio::task::spawn_blocking(move || cpu::burn(cost)).await;
        settle(cost, config.error_rate, burned, &mut rng)
    }
}

/// Turn a finished burn into the request outcome.
fn settle(
    cost: u64,
    error_rate: u32,
    burned: Result<u64, JoinError>,
    rng: &mut fastrand::Rng,
) -> Outcome {
    if let Err(e) = burned {
        tracing::error!(error = %e, cost, "CPU burn task failed");
        return Outcome::BurnFailed { cost };
    }

    if should_fail(error_rate, rng) {
        tracing::info!(cost, error_rate, "Simulating failure");
        metrics::record_simulated_failure();
        return Outcome::SimulatedFailure { cost };
    }

    Outcome::Success(WorkloadResponse {
        message: GREETING.to_string(),
        duration: cost,
    })
}
