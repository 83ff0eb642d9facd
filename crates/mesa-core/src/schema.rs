//! Entity schema definitions and document validation
//!
//! A `SchemaDefinition` is the immutable shape contract for one logical
//! entity. Tenants share schemas; they differ only in data. Definitions are
//! registered once at startup and never mutated afterwards.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// Primitive type of one entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// RFC 3339 timestamp carried as a JSON string
    Date,
    Array,
    Object,
}

impl FieldType {
    /// Whether a JSON value conforms to this type. `Null` never conforms;
    /// absence is handled by the required check.
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Date => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

/// Definition of one entity field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field type
    pub field_type: FieldType,

    /// Whether the field must be present on every document
    #[serde(default)]
    pub required: bool,

    /// Value applied on insert when the field is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Closed set of allowed values (enum constraint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

impl FieldDefinition {
    /// Create an optional field of the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            allowed: None,
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default applied on insert
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Constrain the field to a closed set of values
    pub fn one_of(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }
}

/// Immutable shape contract for one logical entity, shared across tenants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Entity name, e.g. `"Order"` or `"MenuItem"`
    pub entity: String,

    /// Field definitions keyed by field name
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl SchemaDefinition {
    /// Start a definition for the named entity
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field definition (builder style)
    pub fn field(mut self, name: impl Into<String>, def: FieldDefinition) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Fill in defaults for absent fields (applied on insert only)
    pub fn apply_defaults(&self, fields: &mut Map<String, Value>) {
        for (name, def) in &self.fields {
            if let Some(default) = &def.default
                && !fields.contains_key(name)
            {
                fields.insert(name.clone(), default.clone());
            }
        }
    }

    /// Validate a full set of document fields against this schema.
    ///
    /// Checks required-field presence, type conformance and enum membership,
    /// and rejects fields the schema does not define.
    ///
    /// # Errors
    /// - `Error::Validation` describing the first violation found
    pub fn validate(&self, fields: &Map<String, Value>) -> Result<()> {
        for (name, def) in &self.fields {
            match fields.get(name) {
                None | Some(Value::Null) => {
                    if def.required {
                        return Err(Error::Validation(format!(
                            "{}: missing required field '{}'",
                            self.entity, name
                        )));
                    }
                }
                Some(value) => {
                    if !def.field_type.accepts(value) {
                        return Err(Error::Validation(format!(
                            "{}: field '{}' has wrong type (expected {:?})",
                            self.entity, name, def.field_type
                        )));
                    }
                    if let Some(allowed) = &def.allowed
                        && !allowed.contains(value)
                    {
                        return Err(Error::Validation(format!(
                            "{}: field '{}' value {} is not one of the allowed values",
                            self.entity, name, value
                        )));
                    }
                }
            }
        }

        if let Some(unknown) = fields.keys().find(|k| !self.fields.contains_key(*k)) {
            return Err(Error::Validation(format!(
                "{}: unknown field '{}'",
                self.entity, unknown
            )));
        }

        Ok(())
    }
}
