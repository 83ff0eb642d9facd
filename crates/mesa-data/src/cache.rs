//! The model cache
//!
//! Caches entity handles keyed by (tenant, entity) so repeated lookups skip
//! schema lookup and connection acquisition entirely. Hits read the sharded
//! map without any global lock; misses serialize per key behind an async
//! gate so concurrent first lookups bind exactly one handle.
//!
//! When the registry evicts a connection, a pruner task drops every cached
//! handle bound to it. The liveness check on the hit path is the backstop:
//! a handle whose connection is mid-teardown is never returned, even if the
//! eviction event has not been processed yet.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};

use mesa_catalog::SchemaCatalog;
use mesa_core::tenant::TenantKey;
use mesa_core::Result;
use mesa_registry::ConnectionRegistry;

use crate::handle::EntityHandle;

type HandleKey = (TenantKey, String);

/// Cached handle plus last-access bookkeeping
struct CacheEntry {
    handle: Arc<EntityHandle>,
    last_access_ms: AtomicU64,
}

/// Handle cache over the schema catalog and connection registry
pub struct ModelCache {
    catalog: Arc<SchemaCatalog>,
    registry: Arc<ConnectionRegistry>,
    entries: DashMap<HandleKey, CacheEntry>,
    /// Per-key gates serializing cache misses (double-checked locking)
    gates: DashMap<HandleKey, Arc<tokio::sync::Mutex<()>>>,
    started: Instant,
    pruner: Mutex<Option<mpsc::Sender<()>>>,
}

impl ModelCache {
    pub fn new(catalog: Arc<SchemaCatalog>, registry: Arc<ConnectionRegistry>) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            registry,
            entries: DashMap::new(),
            gates: DashMap::new(),
            started: Instant::now(),
            pruner: Mutex::new(None),
        })
    }

    /// Get the handle for (tenant, entity), binding it on first access.
    ///
    /// # Errors
    /// - `Error::UnknownEntity` if the entity is not in the catalog
    /// - `Error::ConnectionTimeout` / `Error::ConnectionUnavailable`
    ///   propagated unchanged from the connection registry
    pub async fn get(&self, tenant: &TenantKey, entity: &str) -> Result<Arc<EntityHandle>> {
        let key = (tenant.clone(), entity.to_string());

        if let Some(handle) = self.lookup(&key) {
            return Ok(handle);
        }

        let gate = Arc::clone(&self.gates.entry(key.clone()).or_default());
        let _guard = gate.lock().await;

        // Re-check: another caller may have bound the handle while we
        // waited on the gate.
        if let Some(handle) = self.lookup(&key) {
            return Ok(handle);
        }

        let schema = self.catalog.get(entity)?;
        let conn = self.registry.get(tenant).await?;
        let handle = Arc::new(EntityHandle::bind(tenant.clone(), schema, conn).await?);

        self.entries.insert(
            key,
            CacheEntry {
                handle: Arc::clone(&handle),
                last_access_ms: AtomicU64::new(self.elapsed_ms()),
            },
        );
        tracing::debug!(%tenant, entity, "cached entity handle");
        Ok(handle)
    }

    /// Lock-free hit path: returns the cached handle if it is still bound
    /// to a live connection
    fn lookup(&self, key: &HandleKey) -> Option<Arc<EntityHandle>> {
        let entry = self.entries.get(key)?;
        if !entry.handle.is_live() {
            return None;
        }
        entry
            .last_access_ms
            .store(self.elapsed_ms(), Ordering::Relaxed);
        Some(Arc::clone(&entry.handle))
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Drop every cached handle for a tenant. Returns how many were removed.
    pub fn invalidate_tenant(&self, tenant: &TenantKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.0 != *tenant);
        before - self.entries.len()
    }

    /// Drop every handle whose connection is no longer live
    pub fn purge_dead(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.handle.is_live());
        before - self.entries.len()
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawn the task that invalidates handles when the registry evicts
    /// their connection. Idempotent.
    pub fn start_pruner(self: &Arc<Self>) {
        let mut guard = self.pruner.lock().unwrap();
        if guard.is_some() {
            return;
        }
        let (tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *guard = Some(tx);

        let mut evictions = self.registry.subscribe();
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    event = evictions.recv() => {
                        let Some(cache) = cache.upgrade() else { break };
                        match event {
                            Ok(ev) => {
                                let removed = cache.invalidate_tenant(&ev.tenant);
                                if removed > 0 {
                                    tracing::debug!(
                                        tenant = %ev.tenant,
                                        generation = ev.generation,
                                        removed,
                                        "invalidated handles for evicted connection"
                                    );
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "eviction events lagged; purging dead handles");
                                cache.purge_dead();
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
            tracing::debug!("handle pruner stopped");
        });
    }

    /// Stop the pruner task
    pub async fn stop_pruner(&self) {
        let tx = self.pruner.lock().unwrap().take();
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
