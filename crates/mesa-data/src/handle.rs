//! Entity handles
//!
//! An `EntityHandle` is one entity's schema bound to one tenant's live
//! connection: the unit callers actually operate on. Handles are cheap to
//! clone via `Arc`, safe to retain across many operations, and become
//! invalid only when their connection is evicted, at which point every
//! operation fails with a retryable error and the next `resolve` rebinds
//! against a fresh connection.

use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use mesa_core::document::{Document, Filter};
use mesa_core::schema::SchemaDefinition;
use mesa_core::tenant::TenantKey;
use mesa_core::{Error, Result};
use mesa_registry::TenantConnection;

/// One entity's schema bound to one tenant's connection
pub struct EntityHandle {
    tenant: TenantKey,
    schema: Arc<SchemaDefinition>,
    conn: Arc<TenantConnection>,
}

impl EntityHandle {
    /// Bind a schema to a tenant connection, preparing the entity's storage.
    ///
    /// Preparation runs under a lease so the connection cannot be evicted
    /// mid-bind.
    pub(crate) async fn bind(
        tenant: TenantKey,
        schema: Arc<SchemaDefinition>,
        conn: Arc<TenantConnection>,
    ) -> Result<Self> {
        let lease = conn.lease()?;
        lease.storage().prepare(&schema).await?;
        drop(lease);
        tracing::debug!(%tenant, entity = %schema.entity, "bound entity handle");
        Ok(Self {
            tenant,
            schema,
            conn,
        })
    }

    /// The tenant this handle is scoped to
    pub fn tenant(&self) -> &TenantKey {
        &self.tenant
    }

    /// The entity name
    pub fn entity(&self) -> &str {
        &self.schema.entity
    }

    /// The schema this handle validates against
    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    /// Whether the underlying connection is still live
    pub fn is_live(&self) -> bool {
        self.conn.is_open()
    }

    pub(crate) fn connection(&self) -> &Arc<TenantConnection> {
        &self.conn
    }

    /// Insert a new document.
    ///
    /// Schema defaults are applied to absent fields, then the document is
    /// validated and stamped with a fresh id and timestamps.
    ///
    /// # Errors
    /// - `Error::Validation` if the fields do not conform to the schema
    /// - `Error::ConnectionUnavailable` if the connection was evicted
    pub async fn insert(&self, fields: Map<String, Value>) -> Result<Document> {
        let mut fields = fields;
        self.schema.apply_defaults(&mut fields);
        self.schema.validate(&fields)?;

        let doc = Document::new(fields);
        let lease = self.conn.lease()?;
        lease.storage().insert(self.entity(), &doc).await?;
        Ok(doc)
    }

    /// Find documents matching a filter
    pub async fn find(&self, filter: &Filter) -> Result<Vec<Document>> {
        let lease = self.conn.lease()?;
        lease.storage().find(self.entity(), filter).await
    }

    /// Fetch a document by id.
    ///
    /// # Errors
    /// - `Error::DocumentNotFound` if no document has the id
    pub async fn get(&self, id: Uuid) -> Result<Document> {
        let lease = self.conn.lease()?;
        lease
            .storage()
            .get(self.entity(), id)
            .await?
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    /// Apply changes to a document by id.
    ///
    /// Changed fields replace existing values; a `null` value removes the
    /// field. The merged document is re-validated before it is written and
    /// `updated_at` is bumped.
    ///
    /// # Errors
    /// - `Error::DocumentNotFound` if no document has the id
    /// - `Error::Validation` if the merged document no longer conforms
    pub async fn update(&self, id: Uuid, changes: Map<String, Value>) -> Result<Document> {
        let lease = self.conn.lease()?;
        let mut doc = lease
            .storage()
            .get(self.entity(), id)
            .await?
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        for (field, value) in changes {
            if value.is_null() {
                doc.fields.remove(&field);
            } else {
                doc.fields.insert(field, value);
            }
        }
        self.schema.validate(&doc.fields)?;
        doc.updated_at = Utc::now();

        let matched = lease.storage().update(self.entity(), &doc).await?;
        if !matched {
            return Err(Error::DocumentNotFound(id.to_string()));
        }
        Ok(doc)
    }

    /// Delete a document by id.
    ///
    /// # Errors
    /// - `Error::DocumentNotFound` if no document has the id
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let lease = self.conn.lease()?;
        if !lease.storage().delete(self.entity(), id).await? {
            return Err(Error::DocumentNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Count documents matching a filter's conditions
    pub async fn count(&self, filter: &Filter) -> Result<u64> {
        let lease = self.conn.lease()?;
        lease.storage().count(self.entity(), filter).await
    }
}

impl std::fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHandle")
            .field("tenant", &self.tenant)
            .field("entity", &self.schema.entity)
            .field("live", &self.is_live())
            .finish()
    }
}
