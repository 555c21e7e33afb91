//! Entity-level schema: the field map and its projections.

use crate::{FieldSchema, RelationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema of one entity type, keyed by field name.
///
/// The projections below are pure filters over the field map, recomputed on
/// each call; field maps are small enough that caching buys nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Entity type name, e.g. `product` or `product_category`.
    pub entity: String,
    /// Field schemas keyed by field name.
    pub properties: BTreeMap<String, FieldSchema>,
}

impl EntityDefinition {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style field registration, used by tests and fixtures.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        self.properties.insert(name.into(), field);
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSchema> {
        self.properties.get(name)
    }

    /// Iterates all fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldSchema)> {
        self.properties.iter()
    }

    /// Filters field schemas by a predicate, preserving name order.
    pub fn filter_properties<'a, F>(&'a self, mut filter: F) -> BTreeMap<&'a str, &'a FieldSchema>
    where
        F: FnMut(&FieldSchema) -> bool,
    {
        self.properties
            .iter()
            .filter(|(_, field)| filter(field))
            .map(|(name, field)| (name.as_str(), field))
            .collect()
    }

    /// All fields flagged as primary key.
    pub fn primary_key_fields(&self) -> BTreeMap<&str, &FieldSchema> {
        self.filter_properties(|f| f.flags.primary_key)
    }

    /// All association fields, regardless of relation kind.
    pub fn association_fields(&self) -> BTreeMap<&str, &FieldSchema> {
        self.filter_properties(FieldSchema::is_association)
    }

    /// One-to-many and many-to-many associations.
    pub fn to_many_associations(&self) -> BTreeMap<&str, &FieldSchema> {
        self.filter_properties(FieldSchema::is_to_many)
    }

    /// One-to-one and many-to-one associations.
    pub fn to_one_associations(&self) -> BTreeMap<&str, &FieldSchema> {
        self.filter_properties(FieldSchema::is_to_one)
    }

    /// String/text fields carrying the translatable flag.
    pub fn translatable_fields(&self) -> BTreeMap<&str, &FieldSchema> {
        self.filter_properties(FieldSchema::is_translatable)
    }

    /// All fields flagged required.
    pub fn required_fields(&self) -> BTreeMap<&str, &FieldSchema> {
        self.filter_properties(|f| f.flags.required)
    }

    /// Names of fields whose type or relation did not classify, reported by
    /// the registry on registration.
    pub(crate) fn unclassified_fields(&self) -> Vec<(&str, &FieldSchema)> {
        self.properties
            .iter()
            .filter(|(_, field)| field.is_unclassified())
            .map(|(name, field)| (name.as_str(), field))
            .collect()
    }

    /// The associated entity type of a named association field, if declared.
    pub fn association_entity(&self, field_name: &str) -> Option<&str> {
        self.get_field(field_name)
            .filter(|f| f.is_association())
            .and_then(|f| f.entity.as_deref())
    }

    /// The relation kind of a named association field.
    pub fn relation_of(&self, field_name: &str) -> Option<RelationKind> {
        self.get_field(field_name).and_then(|f| f.relation)
    }
}
