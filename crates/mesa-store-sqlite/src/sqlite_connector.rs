//! SQLite connector and per-tenant document store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::PathBuf;
use uuid::Uuid;

use mesa_core::connector::{Connector, StorageConnection};
use mesa_core::document::{Document, Filter};
use mesa_core::schema::SchemaDefinition;
use mesa_core::tenant::TenantKey;
use mesa_core::{Error, Result};

/// Placeholder substituted with the tenant key in address templates
const TENANT_PLACEHOLDER: &str = "${tenant}";

/// SQLite backend configuration
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Database file path template; `${tenant}` becomes the tenant key
    pub address_template: String,

    /// Pool size per tenant database
    pub max_pool_connections: u32,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            address_template: format!("data/tenants/{}.db", TENANT_PLACEHOLDER),
            max_pool_connections: 5,
        }
    }
}

impl SqliteStoreConfig {
    /// Set the database file path template
    pub fn with_address_template(mut self, template: impl Into<String>) -> Self {
        self.address_template = template.into();
        self
    }

    /// Set the pool size per tenant database
    pub fn with_max_pool_connections(mut self, max: u32) -> Self {
        self.max_pool_connections = max;
        self
    }
}

/// Connector establishing one SQLite database per tenant
pub struct SqliteConnector {
    config: SqliteStoreConfig,
}

impl SqliteConnector {
    pub fn new(config: SqliteStoreConfig) -> Self {
        Self { config }
    }

    fn database_path(&self, tenant: &TenantKey) -> PathBuf {
        PathBuf::from(
            self.config
                .address_template
                .replace(TENANT_PLACEHOLDER, tenant.as_str()),
        )
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    async fn connect(&self, tenant: &TenantKey) -> Result<Box<dyn StorageConnection>> {
        let path = self.database_path(tenant);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::ConnectionUnavailable(format!(
                    "cannot create storage directory {:?}: {}",
                    parent, e
                ))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(self.config.max_pool_connections)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await
            .map_err(|e| {
                Error::ConnectionUnavailable(format!(
                    "cannot open tenant database {:?}: {}",
                    path, e
                ))
            })?;

        tracing::debug!(%tenant, ?path, "opened tenant database");
        Ok(Box::new(SqliteTenantStore { pool }))
    }
}

/// One tenant's document store
struct SqliteTenantStore {
    pool: SqlitePool,
}

/// Map an entity name to its document table, e.g. `MenuItem` becomes
/// `docs_menu_item`. The prefix keeps SQL keywords like `Order` harmless.
fn table_name(entity: &str) -> String {
    let mut name = String::with_capacity(entity.len() + 8);
    name.push_str("docs_");
    for (i, ch) in entity.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                name.push('_');
            }
            name.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            name.push(ch);
        } else {
            name.push('_');
        }
    }
    name
}

/// Reject field names that cannot be spliced into a `json_extract` path
fn check_field_name(field: &str) -> Result<()> {
    if field.is_empty()
        || !field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::Validation(format!(
            "invalid field name '{}' in filter",
            field
        )));
    }
    Ok(())
}

/// Sort/filter expression for a field: timestamp columns are addressed
/// directly, data fields through `json_extract`
fn field_expr(field: &str) -> Result<String> {
    check_field_name(field)?;
    Ok(match field {
        "created_at" | "updated_at" => field.to_string(),
        _ => format!("json_extract(fields, '$.{}')", field),
    })
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let created_at: String = row.try_get("created_at").map_err(db_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(db_err)?;
    let fields: String = row.try_get("fields").map_err(db_err)?;

    Ok(Document {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Storage(format!("corrupt document id '{}': {}", id, e)))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        fields: serde_json::from_str(&fields)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("corrupt timestamp '{}': {}", raw, e)))
}

impl SqliteTenantStore {
    /// Compile filter conditions into a WHERE clause; values are bound
    /// positionally by `bind_condition_values`
    fn where_clause(filter: &Filter) -> Result<String> {
        if filter.conditions.is_empty() {
            return Ok(String::new());
        }
        let mut predicates = Vec::with_capacity(filter.conditions.len());
        for (field, _) in &filter.conditions {
            predicates.push(format!("{} = ?", field_expr(field)?));
        }
        Ok(format!(" WHERE {}", predicates.join(" AND ")))
    }

    fn bind_condition_values<'q>(
        mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        filter: &'q Filter,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        for (_, value) in &filter.conditions {
            query = match value {
                serde_json::Value::String(s) => query.bind(s.as_str()),
                serde_json::Value::Bool(b) => query.bind(*b),
                serde_json::Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        query.bind(i)
                    } else {
                        query.bind(n.as_f64().unwrap_or_default())
                    }
                }
                other => query.bind(other.to_string()),
            };
        }
        query
    }
}

#[async_trait]
impl StorageConnection for SqliteTenantStore {
    async fn prepare(&self, schema: &SchemaDefinition) -> Result<()> {
        let table = table_name(&schema.entity);
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                fields TEXT NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table} (created_at)"
        ))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn insert(&self, entity: &str, doc: &Document) -> Result<()> {
        let table = table_name(entity);
        let fields = serde_json::to_string(&doc.fields)?;
        sqlx::query(&format!(
            "INSERT INTO {table} (id, created_at, updated_at, fields) VALUES (?, ?, ?, ?)"
        ))
        .bind(doc.id.to_string())
        .bind(doc.created_at.to_rfc3339())
        .bind(doc.updated_at.to_rfc3339())
        .bind(fields)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, entity: &str, filter: &Filter) -> Result<Vec<Document>> {
        let table = table_name(entity);
        let mut sql = format!(
            "SELECT id, created_at, updated_at, fields FROM {table}{}",
            Self::where_clause(filter)?
        );
        if let Some(sort) = &filter.sort {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                field_expr(&sort.field)?,
                if sort.descending { "DESC" } else { "ASC" }
            ));
        }
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let query = Self::bind_condition_values(sqlx::query(&sql), filter);
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(row_to_document).collect()
    }

    async fn get(&self, entity: &str, id: Uuid) -> Result<Option<Document>> {
        let table = table_name(entity);
        let row = sqlx::query(&format!(
            "SELECT id, created_at, updated_at, fields FROM {table} WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn update(&self, entity: &str, doc: &Document) -> Result<bool> {
        let table = table_name(entity);
        let fields = serde_json::to_string(&doc.fields)?;
        let result = sqlx::query(&format!(
            "UPDATE {table} SET updated_at = ?, fields = ? WHERE id = ?"
        ))
        .bind(doc.updated_at.to_rfc3339())
        .bind(fields)
        .bind(doc.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, entity: &str, id: Uuid) -> Result<bool> {
        let table = table_name(entity);
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, entity: &str, filter: &Filter) -> Result<u64> {
        let table = table_name(entity);
        let sql = format!(
            "SELECT COUNT(*) AS n FROM {table}{}",
            Self::where_clause(filter)?
        );
        let row = Self::bind_condition_values(sqlx::query(&sql), filter)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let count: i64 = row.try_get("n").map_err(db_err)?;
        Ok(count as u64)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
