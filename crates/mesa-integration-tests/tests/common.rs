//! Common test utilities for integration tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use mesa_core::connector::{Connector, StorageConnection};
use mesa_core::document::{Document, Filter};
use mesa_core::schema::SchemaDefinition;
use mesa_core::tenant::TenantKey;
use mesa_core::{Error, Result};

/// In-memory connector with an establishment counter, controllable connect
/// latency, a reachability toggle and per-operation latency (for pinning
/// connections with in-flight work)
#[allow(dead_code)]
pub struct CountingConnector {
    established: AtomicUsize,
    unreachable: AtomicBool,
    connect_delay_ms: AtomicU64,
    op_delay_ms: Arc<AtomicU64>,
}

#[allow(dead_code)]
impl CountingConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            established: AtomicUsize::new(0),
            unreachable: AtomicBool::new(false),
            connect_delay_ms: AtomicU64::new(0),
            op_delay_ms: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of connections successfully established so far
    pub fn established(&self) -> usize {
        self.established.load(Ordering::SeqCst)
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay applied inside every storage operation of every connection
    pub fn set_op_delay(&self, delay: Duration) {
        self.op_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for CountingConnector {
    async fn connect(&self, tenant: &TenantKey) -> Result<Box<dyn StorageConnection>> {
        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::ConnectionUnavailable(format!(
                "storage for '{}' unreachable",
                tenant
            )));
        }
        self.established.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStore {
            tables: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            op_delay_ms: Arc::clone(&self.op_delay_ms),
        }))
    }
}

/// One tenant's in-memory document store
#[allow(dead_code)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Document>>>,
    closed: AtomicBool,
    op_delay_ms: Arc<AtomicU64>,
}

impl MemoryStore {
    async fn op_delay(&self) {
        let delay = self.op_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

#[async_trait]
impl StorageConnection for MemoryStore {
    async fn prepare(&self, schema: &SchemaDefinition) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .entry(schema.entity.clone())
            .or_default();
        Ok(())
    }

    async fn insert(&self, entity: &str, doc: &Document) -> Result<()> {
        self.op_delay().await;
        self.tables
            .lock()
            .unwrap()
            .entry(entity.to_string())
            .or_default()
            .push(doc.clone());
        Ok(())
    }

    async fn find(&self, entity: &str, filter: &Filter) -> Result<Vec<Document>> {
        self.op_delay().await;
        let docs = self
            .tables
            .lock()
            .unwrap()
            .get(entity)
            .cloned()
            .unwrap_or_default();
        Ok(filter.apply(docs))
    }

    async fn get(&self, entity: &str, id: Uuid) -> Result<Option<Document>> {
        self.op_delay().await;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(entity)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn update(&self, entity: &str, doc: &Document) -> Result<bool> {
        self.op_delay().await;
        let mut tables = self.tables.lock().unwrap();
        let Some(docs) = tables.get_mut(entity) else {
            return Ok(false);
        };
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => {
                *existing = doc.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, entity: &str, id: Uuid) -> Result<bool> {
        self.op_delay().await;
        let mut tables = self.tables.lock().unwrap();
        let Some(docs) = tables.get_mut(entity) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() < before)
    }

    async fn count(&self, entity: &str, filter: &Filter) -> Result<u64> {
        self.op_delay().await;
        let tables = self.tables.lock().unwrap();
        let count = tables
            .get(entity)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Initialize test logging once; respects `RUST_LOG`
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Shorthand for a validated tenant key
#[allow(dead_code)]
pub fn tenant(slug: &str) -> TenantKey {
    TenantKey::new(slug).unwrap()
}

/// Shorthand turning a JSON object literal into document fields
#[allow(dead_code)]
pub fn fields(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    let serde_json::Value::Object(map) = value else {
        panic!("expected a JSON object");
    };
    map
}
