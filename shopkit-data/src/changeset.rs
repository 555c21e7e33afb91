//! Changeset generation: draft vs. origin → minimal write payload.
//!
//! Removing a to-many link is a different wire operation from upserting the
//! owning entity, so association removals are collected into their own
//! deletion queue instead of the changes object; a single PATCH cannot
//! express both.

use crate::{EntityRef, FieldValue};
use serde_json::{Map, Value};
use shopkit_schema::{FieldSchema, SchemaRegistry, SchemaResult};
use std::collections::HashSet;

/// A queued association removal: one explicit delete (or batched sync
/// delete) per entry.
#[derive(Debug, Clone)]
pub struct Deletion {
    /// The associated entity type the removal belongs to.
    pub entity: String,
    /// The association's resource route, e.g. `/product/{id}/categories`.
    pub route: String,
    /// The removed entity's primary-key value.
    pub key: String,
    /// The removed entity's primary-key data, used by batched sync deletes.
    pub primary: Map<String, Value>,
}

/// The derived diff of an entity: field changes (or `None` when nothing
/// differs) plus queued association removals.
#[derive(Debug, Default)]
pub struct Changeset {
    pub changes: Option<Map<String, Value>>,
    pub deletion_queue: Vec<Deletion>,
}

impl Changeset {
    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.changes.is_none() && self.deletion_queue.is_empty()
    }
}

/// Computes changesets by diffing an entity's draft against its origin.
#[derive(Debug, Default)]
pub struct ChangesetGenerator;

impl ChangesetGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Diffs `entity` against its origin snapshot.
    ///
    /// Scalar and json fields are included iff the value differs (deep
    /// equality). A to-one association that differs by identity or carries a
    /// non-empty nested diff is represented by its identifying reference.
    /// To-many membership is compared by id: additions contribute a payload
    /// entry (primary key plus the member's own diff), removals are queued
    /// as deletions. When the entity is new and the diff is non-empty, its
    /// primary-key data is merged in.
    pub fn generate(&self, entity: &EntityRef, registry: &SchemaRegistry) -> SchemaResult<Changeset> {
        let mut visited = HashSet::new();
        self.generate_inner(entity, registry, &mut visited)
    }

    /// Extracts the draft's primary-key fields, used to stamp identifying
    /// keys onto bulk-upsert payloads that otherwise only contain changes.
    pub fn get_primary_key_data(
        &self,
        entity: &EntityRef,
        registry: &SchemaRegistry,
    ) -> SchemaResult<Map<String, Value>> {
        let guard = entity.read();
        let definition = registry.get(guard.entity_type())?;

        let mut data = Map::new();
        for (name, _) in definition.primary_key_fields() {
            if let Some(FieldValue::Value(value)) = guard.get(name) {
                data.insert(name.to_string(), value.clone());
            }
        }
        Ok(data)
    }

    fn generate_inner(
        &self,
        entity: &EntityRef,
        registry: &SchemaRegistry,
        visited: &mut HashSet<usize>,
    ) -> SchemaResult<Changeset> {
        // An entity already on this walk contributes nothing again; this
        // terminates cyclic graphs and deduplicates shared members.
        if !visited.insert(entity.ptr_key()) {
            return Ok(Changeset::default());
        }

        let guard = entity.read();
        let definition = registry.get(guard.entity_type())?;
        let is_new = guard.is_new();

        let mut changes = Map::new();
        let mut deletions = Vec::new();

        for (name, field) in definition.fields() {
            if field.flags.extension {
                continue;
            }
            self.diff_field(
                name,
                field,
                guard.draft(),
                guard.origin(),
                registry,
                visited,
                &mut changes,
                &mut deletions,
            )?;
        }

        // Extension-flagged fields live in the extensions container and diff
        // under a nested object.
        if let Some(draft_extensions) = guard.get("extensions").and_then(FieldValue::as_map) {
            let empty = std::collections::BTreeMap::new();
            let origin_extensions = guard
                .origin_value("extensions")
                .and_then(FieldValue::as_map)
                .unwrap_or(&empty);

            let mut extension_changes = Map::new();
            for (name, field) in definition.fields() {
                if !field.flags.extension {
                    continue;
                }
                self.diff_field(
                    name,
                    field,
                    draft_extensions,
                    origin_extensions,
                    registry,
                    visited,
                    &mut extension_changes,
                    &mut deletions,
                )?;
            }
            if !extension_changes.is_empty() {
                changes.insert("extensions".to_string(), Value::Object(extension_changes));
            }
        }

        drop(guard);

        let changes = if changes.is_empty() {
            None
        } else if is_new {
            let mut changes = changes;
            for (key, value) in self.get_primary_key_data(entity, registry)? {
                changes.insert(key, value);
            }
            Some(changes)
        } else {
            Some(changes)
        };

        Ok(Changeset {
            changes,
            deletion_queue: deletions,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn diff_field(
        &self,
        name: &str,
        field: &FieldSchema,
        draft: &std::collections::BTreeMap<String, FieldValue>,
        origin: &std::collections::BTreeMap<String, FieldValue>,
        registry: &SchemaRegistry,
        visited: &mut HashSet<usize>,
        changes: &mut Map<String, Value>,
        deletions: &mut Vec<Deletion>,
    ) -> SchemaResult<()> {
        if field.read_only || field.flags.computed {
            return Ok(());
        }

        if field.is_scalar() || field.is_json() {
            let Some(FieldValue::Value(draft_value)) = draft.get(name) else {
                return Ok(());
            };
            match origin.get(name) {
                Some(FieldValue::Value(origin_value)) if origin_value == draft_value => {}
                _ => {
                    changes.insert(name.to_string(), draft_value.clone());
                }
            }
            return Ok(());
        }

        if field.is_to_one() {
            let Some(FieldValue::Entity(draft_entity)) = draft.get(name) else {
                return Ok(());
            };

            let same_identity = matches!(
                origin.get(name),
                Some(FieldValue::Entity(origin_entity))
                    if EntityRef::ptr_eq(draft_entity, origin_entity)
            );
            let changed = if same_identity {
                self.generate_inner(draft_entity, registry, visited)?
                    .changes
                    .is_some()
            } else {
                true
            };

            if changed {
                let reference = self.get_primary_key_data(draft_entity, registry)?;
                changes.insert(name.to_string(), Value::Object(reference));
            }
            return Ok(());
        }

        if field.is_to_many() {
            let Some(FieldValue::Collection(draft_collection)) = draft.get(name) else {
                return Ok(());
            };
            let origin_items: Vec<EntityRef> = match origin.get(name) {
                Some(FieldValue::Collection(collection)) => collection.items().to_vec(),
                _ => Vec::new(),
            };

            let origin_ids: HashSet<String> = origin_items.iter().map(EntityRef::id).collect();
            let draft_ids: HashSet<String> = draft_collection.iter().map(EntityRef::id).collect();

            let mut payload = Vec::new();
            for member in draft_collection.iter() {
                let nested = self.generate_inner(member, registry, visited)?;
                deletions.extend(nested.deletion_queue);

                let added = !origin_ids.contains(&member.id());
                let mut entry = nested.changes.unwrap_or_default();
                if added || !entry.is_empty() {
                    for (key, value) in self.get_primary_key_data(member, registry)? {
                        entry.insert(key, value);
                    }
                    payload.push(Value::Object(entry));
                }
            }
            if !payload.is_empty() {
                changes.insert(name.to_string(), Value::Array(payload));
            }

            for member in origin_items.iter().filter(|m| !draft_ids.contains(&m.id())) {
                let primary = self.get_primary_key_data(member, registry)?;
                deletions.push(Deletion {
                    entity: field.entity.clone().unwrap_or_default(),
                    route: draft_collection.source().to_string(),
                    key: member.id(),
                    primary,
                });
            }
            return Ok(());
        }

        // Unclassifiable fields diff nothing; the registry reported them at
        // registration.
        Ok(())
    }
}
