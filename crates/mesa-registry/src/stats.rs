//! Registry counters
//!
//! Atomic counters for connection lifecycle events, snapshot-able for
//! dashboards and tests (establishment counts are how reuse and transparent
//! recovery are observed from the outside).

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct RegistryStats {
    established: AtomicU64,
    reused: AtomicU64,
    evicted: AtomicU64,
    timeouts: AtomicU64,
    failures: AtomicU64,
}

impl RegistryStats {
    pub(crate) fn record_established(&self) {
        self.established.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reuse(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            established: self.established.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    /// Connections successfully established
    pub established: u64,
    /// Acquisitions served from an existing connection
    pub reused: u64,
    /// Connections evicted (idle, capacity or shutdown)
    pub evicted: u64,
    /// Establishment attempts that exceeded the timeout
    pub timeouts: u64,
    /// Establishment attempts that failed outright
    pub failures: u64,
}
