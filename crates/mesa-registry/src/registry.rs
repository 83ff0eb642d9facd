//! The connection registry
//!
//! One live connection per tenant, created on first demand. Concurrent
//! first acquisitions for the same tenant converge on a single establishment
//! attempt: the first caller spawns a detached task and publishes a watch
//! channel, everyone else awaits the shared result. Because the work runs in
//! its own task, a caller cancelling its acquisition never aborts
//! establishment for the remaining waiters.
//!
//! Failed or timed-out attempts remove their slot, so the next acquisition
//! retries from scratch; the registry is never poisoned by one bad attempt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::sleep;

use mesa_core::connector::Connector;
use mesa_core::tenant::TenantKey;
use mesa_core::{Error, Result};

use crate::config::RegistryConfig;
use crate::connection::TenantConnection;
use crate::stats::{RegistrySnapshot, RegistryStats};

/// Why a connection was evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Idle longer than the configured threshold
    Idle,
    /// Displaced to stay under the connection cap
    Capacity,
    /// Registry shutdown
    Shutdown,
}

/// Broadcast to subscribers (the model cache) whenever a connection is
/// evicted, so handles bound to it can be invalidated
#[derive(Debug, Clone)]
pub struct EvictionEvent {
    pub tenant: TenantKey,
    pub generation: u64,
    pub reason: EvictionReason,
}

/// Shared result of one establishment attempt
type EstablishOutcome = Option<std::result::Result<Arc<TenantConnection>, EstablishError>>;

/// Clonable establishment failure, fanned out to every waiter
#[derive(Debug, Clone)]
enum EstablishError {
    Timeout { tenant: String, timeout_ms: u64 },
    Unavailable(String),
}

impl EstablishError {
    fn into_error(self) -> Error {
        match self {
            EstablishError::Timeout { tenant, timeout_ms } => {
                Error::ConnectionTimeout { tenant, timeout_ms }
            }
            EstablishError::Unavailable(msg) => Error::ConnectionUnavailable(msg),
        }
    }
}

enum Slot {
    Ready(Arc<TenantConnection>),
    Connecting(watch::Receiver<EstablishOutcome>),
}

/// Owns every live tenant connection
pub struct ConnectionRegistry {
    connector: Arc<dyn Connector>,
    config: RegistryConfig,
    slots: Arc<Mutex<HashMap<TenantKey, Slot>>>,
    stats: Arc<RegistryStats>,
    evictions: broadcast::Sender<EvictionEvent>,
    next_generation: AtomicU64,
    closed: Arc<AtomicBool>,
    sweeper: Mutex<Option<mpsc::Sender<()>>>,
}

impl ConnectionRegistry {
    /// Create a registry over a storage connector
    pub fn new(connector: Arc<dyn Connector>, config: RegistryConfig) -> Arc<Self> {
        let (evictions, _) = broadcast::channel(64);
        Arc::new(Self {
            connector,
            config,
            slots: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(RegistryStats::default()),
            evictions,
            next_generation: AtomicU64::new(1),
            closed: Arc::new(AtomicBool::new(false)),
            sweeper: Mutex::new(None),
        })
    }

    /// Get the tenant's connection, establishing it on first demand.
    ///
    /// # Errors
    /// - `Error::ConnectionTimeout` if establishment exceeded the bound
    /// - `Error::ConnectionUnavailable` if the tenant's storage is
    ///   unreachable or the registry has been shut down
    pub async fn get(&self, tenant: &TenantKey) -> Result<Arc<TenantConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ConnectionUnavailable(
                "connection registry is shut down".to_string(),
            ));
        }

        let mut rx = {
            let mut slots = self.slots.lock().unwrap();
            let pending = match slots.get(tenant) {
                Some(Slot::Ready(conn)) if conn.is_open() => {
                    conn.touch();
                    self.stats.record_reuse();
                    return Ok(Arc::clone(conn));
                }
                Some(Slot::Connecting(rx)) => Some(rx.clone()),
                _ => None,
            };
            match pending {
                Some(rx) => rx,
                None => self.begin_establish(&mut slots, tenant),
            }
        };

        let outcome = match rx.wait_for(|o| o.is_some()).await {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(Ok(conn)) => Ok(conn),
            Some(Err(e)) => Err(e.into_error()),
            None => Err(Error::ConnectionUnavailable(
                "connection establishment was aborted".to_string(),
            )),
        }
    }

    /// Start the single-flight establishment task for a tenant. Caller holds
    /// the slot lock; the returned receiver resolves with the shared outcome.
    fn begin_establish(
        &self,
        slots: &mut HashMap<TenantKey, Slot>,
        tenant: &TenantKey,
    ) -> watch::Receiver<EstablishOutcome> {
        // Make room before the new connection lands.
        let max = self.config.max_connections;
        for conn in self.shrink_to(slots, max.saturating_sub(1)) {
            self.finish_eviction(conn, EvictionReason::Capacity);
        }

        let (tx, rx) = watch::channel(None);
        slots.insert(tenant.clone(), Slot::Connecting(rx.clone()));

        let connector = Arc::clone(&self.connector);
        let slots_map = Arc::clone(&self.slots);
        let stats = Arc::clone(&self.stats);
        let closed = Arc::clone(&self.closed);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let timeout = self.config.connect_timeout();
        let tenant = tenant.clone();

        tokio::spawn(async move {
            tracing::debug!(%tenant, generation, "establishing tenant connection");
            let outcome = match tokio::time::timeout(timeout, connector.connect(&tenant)).await {
                Ok(Ok(storage)) => {
                    let conn = Arc::new(TenantConnection::new(tenant.clone(), generation, storage));
                    if closed.load(Ordering::Acquire) {
                        // Shut down while connecting; don't leak the connection.
                        conn.force_teardown();
                        if let Err(e) = conn.close_storage().await {
                            tracing::warn!(%tenant, error = %e, "error closing connection established during shutdown");
                        }
                        slots_map.lock().unwrap().remove(&tenant);
                        Err(EstablishError::Unavailable(
                            "connection registry is shut down".to_string(),
                        ))
                    } else {
                        stats.record_established();
                        tracing::info!(%tenant, generation, "tenant connection established");
                        slots_map
                            .lock()
                            .unwrap()
                            .insert(tenant.clone(), Slot::Ready(Arc::clone(&conn)));
                        Ok(conn)
                    }
                }
                Ok(Err(e)) => {
                    stats.record_failure();
                    tracing::warn!(%tenant, error = %e, "tenant connection establishment failed");
                    slots_map.lock().unwrap().remove(&tenant);
                    Err(EstablishError::Unavailable(e.to_string()))
                }
                Err(_) => {
                    stats.record_timeout();
                    let timeout_ms = timeout.as_millis() as u64;
                    tracing::warn!(%tenant, timeout_ms, "tenant connection establishment timed out");
                    slots_map.lock().unwrap().remove(&tenant);
                    Err(EstablishError::Timeout {
                        tenant: tenant.to_string(),
                        timeout_ms,
                    })
                }
            };
            let _ = tx.send(Some(outcome));
        });

        rx
    }

    /// Evict LRU, unreferenced connections until at most `target` slots
    /// remain. Connections with in-flight leases are never victims; if only
    /// those remain the overshoot is deferred to a later sweep.
    fn shrink_to(
        &self,
        slots: &mut HashMap<TenantKey, Slot>,
        target: usize,
    ) -> Vec<Arc<TenantConnection>> {
        let mut victims = Vec::new();
        while slots.len() > target {
            let candidate = slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready(conn) if conn.in_flight() == 0 => {
                        Some((key.clone(), Arc::clone(conn)))
                    }
                    _ => None,
                })
                .max_by_key(|(_, conn)| conn.idle_for());

            let Some((key, conn)) = candidate else {
                tracing::warn!(
                    live = slots.len(),
                    max = self.config.max_connections,
                    "connection cap exceeded but every connection is in use; deferring eviction"
                );
                break;
            };

            if conn.begin_teardown() {
                slots.remove(&key);
                victims.push(conn);
            } else {
                // Lost a race with a fresh lease; give up for this round.
                break;
            }
        }
        victims
    }

    /// Record and announce an eviction, then close the backend connection
    /// in the background
    fn finish_eviction(&self, conn: Arc<TenantConnection>, reason: EvictionReason) {
        self.stats.record_eviction();
        tracing::info!(
            tenant = %conn.tenant(),
            generation = conn.generation(),
            ?reason,
            "evicting tenant connection"
        );
        let _ = self.evictions.send(EvictionEvent {
            tenant: conn.tenant().clone(),
            generation: conn.generation(),
            reason,
        });
        tokio::spawn(async move {
            if let Err(e) = conn.close_storage().await {
                tracing::warn!(tenant = %conn.tenant(), error = %e, "error closing evicted connection");
            }
        });
    }

    /// Evict idle connections and settle any deferred capacity overshoot.
    ///
    /// Called periodically by the sweeper task; public so tests and
    /// embedding applications can drive eviction deterministically.
    /// Returns the number of connections evicted.
    pub fn sweep(&self) -> usize {
        let idle_timeout = self.config.idle_timeout();
        let victims = {
            let mut slots = self.slots.lock().unwrap();

            let idle_keys: Vec<TenantKey> = slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready(conn)
                        if conn.in_flight() == 0 && conn.idle_for() >= idle_timeout =>
                    {
                        Some(key.clone())
                    }
                    _ => None,
                })
                .collect();

            let mut victims = Vec::new();
            for key in idle_keys {
                let conn = match slots.get(&key) {
                    Some(Slot::Ready(conn)) => Arc::clone(conn),
                    _ => continue,
                };
                if conn.begin_teardown() {
                    slots.remove(&key);
                    victims.push((conn, EvictionReason::Idle));
                }
            }

            let max = self.config.max_connections;
            for conn in self.shrink_to(&mut slots, max) {
                victims.push((conn, EvictionReason::Capacity));
            }

            victims
        };

        let evicted = victims.len();
        for (conn, reason) in victims {
            self.finish_eviction(conn, reason);
        }
        evicted
    }

    /// Spawn the background idle-eviction task. Idempotent.
    pub fn start_sweeper(self: &Arc<Self>) {
        let mut guard = self.sweeper.lock().unwrap();
        if guard.is_some() {
            return;
        }
        let (tx, mut rx) = mpsc::channel::<()>(1);
        *guard = Some(tx);

        let registry = Arc::downgrade(self);
        let interval = self.config.sweep_interval();
        tokio::spawn(async move {
            tracing::debug!(
                interval_ms = interval.as_millis() as u64,
                "connection sweeper started"
            );
            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = sleep(interval) => {
                        let Some(registry) = registry.upgrade() else { break };
                        let evicted = registry.sweep();
                        if evicted > 0 {
                            tracing::debug!(evicted, "sweep evicted idle connections");
                        }
                    }
                }
            }
            tracing::debug!("connection sweeper stopped");
        });
    }

    /// Subscribe to eviction events
    pub fn subscribe(&self) -> broadcast::Receiver<EvictionEvent> {
        self.evictions.subscribe()
    }

    /// Registry counters
    pub fn stats(&self) -> RegistrySnapshot {
        self.stats.snapshot()
    }

    /// Number of currently live connections
    pub fn live_connections(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(conn) if conn.is_open()))
            .count()
    }

    /// Close every connection and stop the sweeper. Further acquisitions
    /// fail with `ConnectionUnavailable`.
    pub async fn close_all(&self) {
        self.closed.store(true, Ordering::Release);

        let sweeper = self.sweeper.lock().unwrap().take();
        if let Some(tx) = sweeper {
            let _ = tx.send(()).await;
        }

        let conns: Vec<Arc<TenantConnection>> = {
            let mut slots = self.slots.lock().unwrap();
            slots
                .drain()
                .filter_map(|(_, slot)| match slot {
                    Slot::Ready(conn) => Some(conn),
                    Slot::Connecting(_) => None,
                })
                .collect()
        };

        for conn in conns {
            conn.force_teardown();
            let _ = self.evictions.send(EvictionEvent {
                tenant: conn.tenant().clone(),
                generation: conn.generation(),
                reason: EvictionReason::Shutdown,
            });
            if let Err(e) = conn.close_storage().await {
                tracing::warn!(tenant = %conn.tenant(), error = %e, "error closing connection during shutdown");
            }
        }

        tracing::info!("connection registry shut down");
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("live_connections", &self.live_connections())
            .field("config", &self.config)
            .finish()
    }
}
