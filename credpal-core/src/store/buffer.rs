//! Owned buffers returned by `read`, leased from a bounded heap.
//!
//! A [`CredentialBuffer`] is the only handle to the bytes of a credential
//! read from the volume. It cannot be cloned, its memory is zeroized when it
//! drops, and its lease on the [`HeapBudget`] is returned exactly once, on
//! release or on drop, whichever happens first.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::{StoreError, StoreResult};

/// Bounded allocator for credential read buffers.
#[derive(Debug)]
pub struct HeapBudget {
    capacity: usize,
    outstanding: AtomicUsize,
}

impl HeapBudget {
    /// Creates a budget of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            outstanding: AtomicUsize::new(0),
        })
    }

    /// Total bytes the budget can lease.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently leased to live buffers.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Bytes still available.
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.outstanding())
    }

    /// Leases a zero-filled buffer of exactly `len` bytes.
    pub(crate) fn allocate(self: &Arc<Self>, len: usize) -> StoreResult<CredentialBuffer> {
        let reserved = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |outstanding| {
                outstanding
                    .checked_add(len)
                    .filter(|total| *total <= self.capacity)
            });
        if let Err(outstanding) = reserved {
            return Err(StoreError::AllocationFailure {
                requested: len,
                available: self.capacity.saturating_sub(outstanding),
            });
        }
        let lease = Lease {
            heap: Arc::clone(self),
            len,
        };

        let mut bytes = Vec::new();
        if bytes.try_reserve_exact(len).is_err() {
            let available = self.available().saturating_add(len);
            drop(lease);
            return Err(StoreError::AllocationFailure {
                requested: len,
                available,
            });
        }
        bytes.resize(len, 0);
        Ok(CredentialBuffer {
            bytes: Zeroizing::new(bytes),
            lease,
        })
    }
}

struct Lease {
    heap: Arc<HeapBudget>,
    len: usize,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.heap.outstanding.fetch_sub(self.len, Ordering::AcqRel);
    }
}

/// Credential bytes owned by the caller of `read`.
pub struct CredentialBuffer {
    bytes: Zeroizing<Vec<u8>>,
    lease: Lease,
}

impl CredentialBuffer {
    /// Number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty credential.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub(crate) fn is_leased_from(&self, heap: &Arc<HeapBudget>) -> bool {
        Arc::ptr_eq(&self.lease.heap, heap)
    }
}

impl Deref for CredentialBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for CredentialBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for CredentialBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBuffer")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
