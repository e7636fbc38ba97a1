//! Resident memory used to simulate memory pressure.

use std::collections::TryReserveError;

use rand::RngCore;
use thiserror::Error;

/// The allocator refused a buffer of the requested size.
#[derive(Debug, Error)]
#[error("cannot allocate a {requested} byte memory buffer: {source}")]
pub struct AllocationError {
    pub requested: usize,
    #[source]
    source: TryReserveError,
}

/// A heap region filled with random bytes.
///
/// The content is never read by the service. Filling it with random data
/// touches every page, so the whole allocation counts toward resident memory.
pub struct MemoryBuffer {
    bytes: Box<[u8]>,
}

impl MemoryBuffer {
    pub fn empty() -> Self {
        Self {
            bytes: Box::default(),
        }
    }

    /// Allocate `len` bytes of random content.
    ///
    /// Sizes the allocator cannot satisfy are reported instead of aborting.
    pub fn allocate(len: usize) -> Result<Self, AllocationError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|source| AllocationError {
                requested: len,
                source,
            })?;
        bytes.resize(len, 0u8);

        let mut bytes = bytes.into_boxed_slice();
        rand::thread_rng().fill_bytes(&mut bytes);
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for MemoryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBuffer")
            .field("len", &self.bytes.len())
            .finish()
    }
}
