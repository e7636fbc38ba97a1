//! Configuration schema definitions.
//!
//! The workload document is the hot-reloadable part of the configuration.
//! Field names follow the document format (`errorRate`,
//! `minPrimesCalculated`, ...) so existing YAML files load unchanged.

use serde::{Deserialize, Serialize};

/// Root of the workload document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkloadConfig {
    /// Percentage of requests (0-100) answered with a simulated failure.
    pub error_rate: u32,

    /// CPU cost bounds.
    pub cpu: CpuConfig,

    /// Memory pressure settings.
    pub memory: MemoryConfig,
}

/// CPU cost bounds, expressed as the number of primes to compute.
///
/// A request draws its cost from `[min_primes_calculated, max_primes_calculated)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CpuConfig {
    pub min_primes_calculated: u64,
    pub max_primes_calculated: u64,
}

impl CpuConfig {
    /// Width of the cost range. Zero when the bounds are inverted.
    pub fn span(&self) -> u64 {
        self.max_primes_calculated
            .saturating_sub(self.min_primes_calculated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MemoryConfig {
    /// Size of the resident buffer in bytes.
    pub usage: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero_value() {
        let config = WorkloadConfig::default();
        assert_eq!(config.error_rate, 0);
        assert_eq!(config.cpu.min_primes_calculated, 0);
        assert_eq!(config.cpu.max_primes_calculated, 0);
        assert_eq!(config.memory.usage, 0);
    }

    #[test]
    fn test_span() {
        let cpu = CpuConfig {
            min_primes_calculated: 10,
            max_primes_calculated: 25,
        };
        assert_eq!(cpu.span(), 15);

        let inverted = CpuConfig {
            min_primes_calculated: 25,
            max_primes_calculated: 10,
        };
        assert_eq!(inverted.span(), 0);
    }

    #[test]
    fn test_serializes_document_field_names() {
        let config = WorkloadConfig {
            error_rate: 5,
            cpu: CpuConfig {
                min_primes_calculated: 1,
                max_primes_calculated: 2,
            },
            memory: MemoryConfig { usage: 64 },
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["errorRate"], 5);
        assert_eq!(json["cpu"]["minPrimesCalculated"], 1);
        assert_eq!(json["cpu"]["maxPrimesCalculated"], 2);
        assert_eq!(json["memory"]["usage"], 64);
    }
}
