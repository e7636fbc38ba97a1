//! Synthetic workload subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → generator.rs (read snapshot, draw cost and failure)
//!     → cpu.rs (burn CPU proportional to the cost)
//!     → Outcome → HTTP response
//!
//! memory.rs holds the buffer the config store keeps resident.
//! ```

pub mod cpu;
pub mod generator;
pub mod memory;

pub use generator::{LoadGenerator, Outcome, WorkloadResponse, GREETING};
pub use memory::{AllocationError, MemoryBuffer};
