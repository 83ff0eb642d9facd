//! Entity name to schema definition registry

use std::collections::HashMap;
use std::sync::Arc;

use mesa_core::schema::SchemaDefinition;
use mesa_core::{Error, Result};

/// Immutable registry of entity schema definitions.
///
/// Constructed through [`SchemaCatalogBuilder`] during startup; once built
/// it has no mutation path. The same catalog serves every tenant.
#[derive(Debug)]
pub struct SchemaCatalog {
    entries: HashMap<String, Arc<SchemaDefinition>>,
}

impl SchemaCatalog {
    /// Start building a catalog
    pub fn builder() -> SchemaCatalogBuilder {
        SchemaCatalogBuilder {
            entries: HashMap::new(),
        }
    }

    /// Look up the schema definition for an entity.
    ///
    /// # Errors
    /// - `Error::UnknownEntity` if no definition was registered under the
    ///   name. This is a programmer or configuration error and is never
    ///   retried automatically.
    pub fn get(&self, entity: &str) -> Result<Arc<SchemaDefinition>> {
        self.entries
            .get(entity)
            .cloned()
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    /// Whether an entity is registered
    pub fn contains(&self, entity: &str) -> bool {
        self.entries.contains_key(entity)
    }

    /// Registered entity names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder collecting schema registrations before the catalog is sealed
#[derive(Debug)]
pub struct SchemaCatalogBuilder {
    entries: HashMap<String, Arc<SchemaDefinition>>,
}

impl SchemaCatalogBuilder {
    /// Register an entity schema under its own entity name.
    ///
    /// # Errors
    /// - `Error::Config` on duplicate registration (a startup wiring
    ///   mistake, surfaced immediately)
    pub fn register(mut self, schema: SchemaDefinition) -> Result<Self> {
        let name = schema.entity.clone();
        if self.entries.contains_key(&name) {
            return Err(Error::Config(format!(
                "entity '{}' registered twice",
                name
            )));
        }
        self.entries.insert(name, Arc::new(schema));
        Ok(self)
    }

    /// Seal the catalog
    pub fn build(self) -> SchemaCatalog {
        SchemaCatalog {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesa_core::schema::{FieldDefinition, FieldType};

    fn order_schema() -> SchemaDefinition {
        SchemaDefinition::new("Order")
            .field("items", FieldDefinition::new(FieldType::Array).required())
    }

    #[test]
    fn test_get_registered_entity() {
        let catalog = SchemaCatalog::builder()
            .register(order_schema())
            .unwrap()
            .build();

        let schema = catalog.get("Order").unwrap();
        assert_eq!(schema.entity, "Order");
        assert!(catalog.contains("Order"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_unknown_entity_fails() {
        let catalog = SchemaCatalog::builder().build();
        let err = catalog.get("Order").unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(name) if name == "Order"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = SchemaCatalog::builder()
            .register(order_schema())
            .unwrap()
            .register(order_schema());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_same_definition_for_all_callers() {
        let catalog = SchemaCatalog::builder()
            .register(order_schema())
            .unwrap()
            .build();
        let a = catalog.get("Order").unwrap();
        let b = catalog.get("Order").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
