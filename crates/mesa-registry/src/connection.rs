//! Per-tenant connection state and leasing
//!
//! A `TenantConnection` wraps one backend storage connection together with
//! the bookkeeping the registry needs: an open flag, a lease count for
//! in-flight operations, a last-used instant for LRU decisions and a
//! generation number distinguishing successive connections for the same
//! tenant. Leases are RAII guards; eviction only proceeds when no lease is
//! outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mesa_core::connector::StorageConnection;
use mesa_core::tenant::TenantKey;
use mesa_core::{Error, Result};

#[derive(Debug)]
struct LeaseState {
    in_flight: u32,
    open: bool,
}

/// One tenant's live storage connection plus registry bookkeeping
pub struct TenantConnection {
    tenant: TenantKey,
    generation: u64,
    storage: Box<dyn StorageConnection>,
    /// Lease transitions go through this lock; `open_flag` mirrors
    /// `LeaseState::open` for lock-free liveness reads
    state: Mutex<LeaseState>,
    open_flag: AtomicBool,
    last_used: Mutex<Instant>,
}

impl TenantConnection {
    pub(crate) fn new(
        tenant: TenantKey,
        generation: u64,
        storage: Box<dyn StorageConnection>,
    ) -> Self {
        Self {
            tenant,
            generation,
            storage,
            state: Mutex::new(LeaseState {
                in_flight: 0,
                open: true,
            }),
            open_flag: AtomicBool::new(true),
            last_used: Mutex::new(Instant::now()),
        }
    }

    /// The tenant this connection is bound to
    pub fn tenant(&self) -> &TenantKey {
        &self.tenant
    }

    /// Generation number; a re-established connection for the same tenant
    /// gets a higher generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the connection is live (not evicted or mid-teardown)
    pub fn is_open(&self) -> bool {
        self.open_flag.load(Ordering::Acquire)
    }

    /// Number of in-flight operations holding a lease
    pub fn in_flight(&self) -> u32 {
        self.state.lock().unwrap().in_flight
    }

    /// How long since the connection was last acquired or used
    pub fn idle_for(&self) -> Duration {
        self.last_used.lock().unwrap().elapsed()
    }

    /// Mark the connection as recently used
    pub fn touch(&self) {
        *self.last_used.lock().unwrap() = Instant::now();
    }

    /// Acquire a lease for one operation.
    ///
    /// The connection cannot be evicted while the lease is held.
    ///
    /// # Errors
    /// - `Error::ConnectionUnavailable` if the connection has been closed;
    ///   the caller should re-resolve its handle
    pub fn lease(self: &Arc<Self>) -> Result<ConnectionLease> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(Error::ConnectionUnavailable(format!(
                "connection for tenant '{}' is closed",
                self.tenant
            )));
        }
        state.in_flight += 1;
        drop(state);
        self.touch();
        Ok(ConnectionLease {
            conn: Arc::clone(self),
        })
    }

    /// Begin eviction: close the connection to new leases.
    ///
    /// Returns false (and leaves the connection open) if any lease is
    /// outstanding; eviction is retried after drain.
    pub(crate) fn begin_teardown(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.open || state.in_flight > 0 {
            return false;
        }
        state.open = false;
        self.open_flag.store(false, Ordering::Release);
        true
    }

    /// Close the connection to new leases regardless of outstanding
    /// operations. Shutdown only.
    pub(crate) fn force_teardown(&self) {
        let mut state = self.state.lock().unwrap();
        state.open = false;
        self.open_flag.store(false, Ordering::Release);
    }

    /// Release the backend connection
    pub(crate) async fn close_storage(&self) -> Result<()> {
        self.storage.close().await
    }

    fn release_lease(&self) {
        let mut state = self.state.lock().unwrap();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

impl std::fmt::Debug for TenantConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConnection")
            .field("tenant", &self.tenant)
            .field("generation", &self.generation)
            .field("open", &self.is_open())
            .finish()
    }
}

/// RAII guard pinning a connection for the duration of one operation
pub struct ConnectionLease {
    conn: Arc<TenantConnection>,
}

impl ConnectionLease {
    /// The backend connection, for issuing reads and writes
    pub fn storage(&self) -> &dyn StorageConnection {
        self.conn.storage.as_ref()
    }

    /// The leased connection
    pub fn connection(&self) -> &Arc<TenantConnection> {
        &self.conn
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.conn.release_lease();
    }
}
