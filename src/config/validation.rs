//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (error rate is a percentage, CPU bounds ordered
//!   and capped)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - A `ValidatedConfig` can only be obtained through `validate_config`, so
//!   the store never has to re-check what it is given

use std::ops::Deref;

use thiserror::Error;

use crate::config::schema::WorkloadConfig;

/// Maximum accepted `errorRate`.
pub const MAX_ERROR_RATE: u32 = 100;

/// Maximum accepted `cpu.maxPrimesCalculated`. A burn this size already
/// takes far longer than any request timeout.
pub const MAX_PRIMES_CALCULATED: u64 = 10_000_000_000;

/// A semantic invariant violated by a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cpu.maxPrimesCalculated ({max}) must exceed cpu.minPrimesCalculated ({min})")]
    CpuBounds { min: u64, max: u64 },

    #[error("errorRate {0} is outside 0..=100")]
    ErrorRate(u32),

    #[error("cpu.maxPrimesCalculated ({0}) exceeds 10000000000")]
    CpuLimit(u64),
}

/// A workload configuration that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig(WorkloadConfig);

impl ValidatedConfig {
    pub fn into_inner(self) -> WorkloadConfig {
        self.0
    }
}

impl Deref for ValidatedConfig {
    type Target = WorkloadConfig;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<WorkloadConfig> for ValidatedConfig {
    type Error = Vec<ValidationError>;

    fn try_from(config: WorkloadConfig) -> Result<Self, Self::Error> {
        validate_config(config)
    }
}

/// Check every invariant of `config`, collecting all violations.
pub fn validate_config(config: WorkloadConfig) -> Result<ValidatedConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let cpu = &config.cpu;
    if cpu.max_primes_calculated <= cpu.min_primes_calculated {
        errors.push(ValidationError::CpuBounds {
            min: cpu.min_primes_calculated,
            max: cpu.max_primes_calculated,
        });
    }

    if cpu.max_primes_calculated > MAX_PRIMES_CALCULATED {
        errors.push(ValidationError::CpuLimit(cpu.max_primes_calculated));
    }

    if config.error_rate > MAX_ERROR_RATE {
        errors.push(ValidationError::ErrorRate(config.error_rate));
    }

    if errors.is_empty() {
        Ok(ValidatedConfig(config))
    } else {
        Err(errors)
    }
}
