//! Document and query types
//!
//! A `Document` is one stored record of an entity: a generated id, creation
//! and update timestamps, and a flat map of schema-validated fields.
//! A `Filter` describes which documents a read should return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use uuid::Uuid;

/// One stored record of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document ID (assigned on insert)
    pub id: Uuid,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Entity fields, validated against the entity's schema
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a new document with a fresh id and timestamps
    pub fn new(fields: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            fields,
        }
    }

    /// Get a field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Sort order for query results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field to sort by; `created_at` and `updated_at` address the
    /// document timestamps, anything else addresses a data field
    pub field: String,

    /// Sort descending instead of ascending
    pub descending: bool,
}

/// Query filter over one entity's documents
///
/// Supports equality conditions on fields, a single sort key, and a result
/// limit. Backends compile this to their native query form.
///
/// # Example
/// ```
/// use mesa_core::document::Filter;
///
/// let recent = Filter::new()
///     .field_eq("status", serde_json::json!("pending"))
///     .sort_desc("created_at")
///     .limit(20);
/// assert_eq!(recent.conditions.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Equality conditions; all must match
    pub conditions: Vec<(String, Value)>,

    /// Optional sort key
    pub sort: Option<Sort>,

    /// Maximum number of documents to return
    pub limit: Option<usize>,
}

impl Filter {
    /// Create an empty filter matching all documents
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a field to equal a value
    pub fn field_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.conditions.push((field.into(), value));
        self
    }

    /// Sort ascending by a field
    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            descending: false,
        });
        self
    }

    /// Sort descending by a field
    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            descending: true,
        });
        self
    }

    /// Limit the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document satisfies every equality condition
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value))
    }

    /// Apply the filter in memory: match, sort, then truncate.
    ///
    /// Backends with a native query engine compile the filter instead; this
    /// is the reference semantics they must agree with.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if let Some(sort) = &self.sort {
            out.sort_by(|a, b| {
                let ord = match sort.field.as_str() {
                    "created_at" => a.created_at.cmp(&b.created_at),
                    "updated_at" => a.updated_at.cmp(&b.updated_at),
                    field => compare_values(a.get(field), b.get(field)),
                };
                if sort.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// Order two optional JSON values: absent first, then by type-specific order
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
    }
}
