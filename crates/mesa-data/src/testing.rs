//! In-memory connector for unit tests

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

/// Connector handing out fresh in-memory connections, with controllable
/// latency and reachability plus an establishment counter
pub(crate) struct MemoryConnector {
    established: AtomicUsize,
    unreachable: AtomicBool,
    connect_delay_ms: AtomicU64,
}

impl MemoryConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            established: AtomicUsize::new(0),
            unreachable: AtomicBool::new(false),
            connect_delay_ms: AtomicU64::new(0),
        })
    }

    pub(crate) fn established(&self) -> usize {
        self.established.load(Ordering::SeqCst)
    }

    pub(crate) fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub(crate) fn set_connect_delay(&self, delay: Duration) {
        self.connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, tenant: &TenantKey) -> Result<Box<dyn StorageConnection>> {
        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::ConnectionUnavailable(format!(
                "in-memory storage for '{}' marked unreachable",
                tenant
            )));
        }
        self.established.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection::default()))
    }
}

/// One tenant's in-memory document store
#[derive(Default)]
pub(crate) struct MemoryConnection {
    tables: Mutex<HashMap<String, Vec<Document>>>,
    closed: AtomicBool,
}

#[async_trait]
impl StorageConnection for MemoryConnection {
    async fn prepare(&self, schema: &SchemaDefinition) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .entry(schema.entity.clone())
            .or_default();
        Ok(())
    }

    async fn insert(&self, entity: &str, doc: &Document) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .entry(entity.to_string())
            .or_default()
            .push(doc.clone());
        Ok(())
    }

    async fn find(&self, entity: &str, filter: &Filter) -> Result<Vec<Document>> {
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
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(entity)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn update(&self, entity: &str, doc: &Document) -> Result<bool> {
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
        let mut tables = self.tables.lock().unwrap();
        let Some(docs) = tables.get_mut(entity) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() < before)
    }

    async fn count(&self, entity: &str, filter: &Filter) -> Result<u64> {
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
