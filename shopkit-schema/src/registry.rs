//! The schema registry: one definition per entity type.

use crate::{EntityDefinition, SchemaError, SchemaResult};
use std::collections::BTreeMap;
use std::collections::HashMap;
use tracing::warn;

/// Lookup table of entity definitions, populated once from the server's
/// schema document before any entity is created or hydrated.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    definitions: HashMap<String, EntityDefinition>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a full schema document as served by
    /// `/_info/entity-schema.json` (entity name → definition).
    pub fn from_document(document: BTreeMap<String, EntityDefinition>) -> Self {
        let mut registry = Self::new();
        for (name, definition) in document {
            registry.add(name, definition);
        }
        registry
    }

    /// Registers (or overwrites) a definition under `name`.
    ///
    /// Fields whose type or relation failed to classify are reported here,
    /// once, so a schema drift on the server side is visible instead of
    /// silently dropping those fields from hydration and diffing.
    pub fn add(&mut self, name: impl Into<String>, definition: EntityDefinition) {
        let name = name.into();
        for (field_name, field) in definition.unclassified_fields() {
            warn!(
                entity = %name,
                field = %field_name,
                field_type = ?field.field_type,
                relation = ?field.relation,
                "unclassifiable field in entity schema, it will not hydrate or diff"
            );
        }
        self.definitions.insert(name, definition);
    }

    pub fn has(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Returns the definition for `name` or [`SchemaError::NotFound`].
    pub fn get(&self, name: &str) -> SchemaResult<&EntityDefinition> {
        self.definitions
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Removes a definition. Returns true if one was registered.
    pub fn remove(&mut self, name: &str) -> bool {
        self.definitions.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterates registered entity names.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}
