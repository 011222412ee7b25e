//! System-wide concurrency admission.
//!
//! # Responsibilities
//! - Bound total in-flight balance queries regardless of service
//! - Hand out RAII leases that release on every exit path
//!
//! # Design Decisions
//! - Built on a tokio semaphore; pacing is a separate concern and both
//!   must be satisfied before a live request proceeds
//! - A peak counter is kept so tests can assert the bound was never
//!   exceeded under stress

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ProbeError;

/// Counting admission control for scan queries.
pub struct ConcurrencyGate {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    in_flight: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

impl ConcurrencyGate {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: AtomicUsize::new(0),
        }
    }

    /// Suspend until fewer than `max_concurrent` leases are outstanding,
    /// then take one. Fails only once the gate has been closed.
    pub async fn acquire(&self) -> Result<Lease, ProbeError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProbeError::Cancelled)?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Lease {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Fail all pending and future acquires. Outstanding leases still
    /// release normally.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Leases currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// High-water mark of simultaneously outstanding leases.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A scoped admission ticket. Dropping it releases the slot, on every
/// exit path including cancellation.
pub struct Lease {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
