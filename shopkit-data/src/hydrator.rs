//! Response hydration: JSON:API rows → entity graph.
//!
//! One hydration call owns an identity cache keyed `{type}-{id}`. A row is
//! registered in the cache before its relationships are walked, so cyclic
//! graphs terminate and a row referenced from several places materializes as
//! one shared entity. Referenced-but-missing included rows are skipped, not
//! errors; partial responses are common with sparse fieldsets.

use crate::{Criteria, Entity, EntityCollection, EntityRef, FieldValue};
use serde_json::{Value, json};
use shopkit_schema::{EntityDefinition, SchemaRegistry};
use shopkit_types::ApiContext;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Per-call identity cache: `{entity_type}-{id}` → hydrated entity.
type HydrationCache = HashMap<String, EntityRef>;

/// Turns JSON:API search responses into entity collections.
#[derive(Debug, Default)]
pub struct EntityHydrator;

impl EntityHydrator {
    pub fn new() -> Self {
        Self
    }

    /// Hydrates a full search response, including the top-level `meta.total`
    /// and `aggregations`. The criteria is the one that produced the request;
    /// its association map decides which nested criteria child collections
    /// carry.
    pub fn hydrate_search_result(
        &self,
        route: &str,
        entity_name: &str,
        response: &Value,
        context: &ApiContext,
        criteria: &Criteria,
        registry: &SchemaRegistry,
    ) -> EntityCollection {
        let mut cache = HydrationCache::new();
        let entities = self.hydrate_rows(entity_name, response, context, criteria, registry, &mut cache);

        let total = response.pointer("/meta/total").and_then(Value::as_u64);
        let aggregations = response
            .get("aggregations")
            .filter(|v| !v.is_null())
            .cloned();

        EntityCollection::with_items(
            route,
            entity_name,
            context.clone(),
            criteria.clone(),
            entities,
            aggregations,
            total,
        )
    }

    /// Hydrates a bare data document (no meta, no aggregations).
    pub fn hydrate(
        &self,
        route: &str,
        entity_name: &str,
        data: &Value,
        context: &ApiContext,
        criteria: &Criteria,
        registry: &SchemaRegistry,
    ) -> EntityCollection {
        let mut cache = HydrationCache::new();
        let entities = self.hydrate_rows(entity_name, data, context, criteria, registry, &mut cache);

        EntityCollection::with_items(
            route,
            entity_name,
            context.clone(),
            criteria.clone(),
            entities,
            None,
            None,
        )
    }

    fn hydrate_rows(
        &self,
        entity_name: &str,
        response: &Value,
        context: &ApiContext,
        criteria: &Criteria,
        registry: &SchemaRegistry,
        cache: &mut HydrationCache,
    ) -> Vec<EntityRef> {
        let Some(rows) = response.get("data").and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(entity) =
                self.hydrate_row(entity_name, row, response, context, criteria, registry, cache)
            {
                entities.push(entity);
            }
        }
        entities
    }

    #[allow(clippy::too_many_arguments)]
    fn hydrate_row(
        &self,
        entity_name: &str,
        row: &Value,
        response: &Value,
        context: &ApiContext,
        criteria: &Criteria,
        registry: &SchemaRegistry,
        cache: &mut HydrationCache,
    ) -> Option<EntityRef> {
        let id = row.get("id").and_then(Value::as_str)?;

        let cache_key = format!("{entity_name}-{id}");
        if let Some(cached) = cache.get(&cache_key) {
            return Some(cached.clone());
        }

        let Ok(schema) = registry.get(entity_name) else {
            // Some referenced types (translations) carry no schema and can
            // not be hydrated.
            warn!(entity = entity_name, id, "no schema registered, skipping row");
            return None;
        };

        let mut data: BTreeMap<String, FieldValue> = BTreeMap::new();
        if let Some(attributes) = row.get("attributes").and_then(Value::as_object) {
            for (key, value) in attributes {
                let value = normalize_json_field(schema, key, value);
                data.insert(key.clone(), FieldValue::Value(value));
            }
        }
        data.insert("id".to_string(), FieldValue::Value(Value::String(id.to_string())));

        // Register before walking relationships so cycles resolve to this
        // same handle instead of recursing forever.
        let entity = EntityRef::new(Entity::from_data(id, entity_name, data));
        cache.insert(cache_key, entity.clone());

        if let Some(relationships) = row.get("relationships").and_then(Value::as_object) {
            for (property, relationship) in relationships {
                if property == "extensions" {
                    let extensions = self.hydrate_extensions(
                        id, schema, response, context, criteria, registry, cache,
                    );
                    entity.insert_persistent("extensions", FieldValue::Map(extensions));
                    continue;
                }

                let Some(field) = schema.get_field(property) else {
                    continue;
                };

                if field.is_to_many() {
                    let collection = self.hydrate_to_many(
                        criteria,
                        property,
                        relationship,
                        field.entity.as_deref().unwrap_or_default(),
                        context,
                        response,
                        registry,
                        cache,
                    );
                    entity.insert_persistent(property.clone(), FieldValue::Collection(collection));
                } else if field.is_to_one()
                    && relationship.get("data").is_some_and(Value::is_object)
                {
                    if let Some(nested) = self.hydrate_to_one(
                        criteria,
                        property,
                        relationship,
                        response,
                        context,
                        registry,
                        cache,
                    ) {
                        entity.insert_persistent(property.clone(), FieldValue::Entity(nested));
                    }
                }
            }
        }

        Some(entity)
    }

    /// Hydrates a to-one association from the row referenced in `included`.
    #[allow(clippy::too_many_arguments)]
    fn hydrate_to_one(
        &self,
        criteria: &Criteria,
        property: &str,
        relationship: &Value,
        response: &Value,
        context: &ApiContext,
        registry: &SchemaRegistry,
        cache: &mut HydrationCache,
    ) -> Option<EntityRef> {
        let association_criteria = association_criteria(criteria, property);

        let data = relationship.get("data")?;
        let entity_type = data.get("type").and_then(Value::as_str)?;
        let id = data.get("id").and_then(Value::as_str)?;

        // An already materialized row (e.g. the owner of a cyclic reference)
        // resolves from the cache without needing its own included row.
        if let Some(cached) = cache.get(&format!("{entity_type}-{id}")) {
            return Some(cached.clone());
        }

        let Some(nested_row) = get_included(entity_type, id, response) else {
            debug!(entity = entity_type, id, "referenced row missing from included, skipping");
            return None;
        };

        self.hydrate_row(
            entity_type,
            nested_row,
            response,
            context,
            &association_criteria,
            registry,
            cache,
        )
    }

    /// Hydrates a to-many association into a child collection whose source
    /// is the relationship's related link with the API resource path
    /// stripped.
    #[allow(clippy::too_many_arguments)]
    fn hydrate_to_many(
        &self,
        criteria: &Criteria,
        property: &str,
        relationship: &Value,
        related_entity: &str,
        context: &ApiContext,
        response: &Value,
        registry: &SchemaRegistry,
        cache: &mut HydrationCache,
    ) -> EntityCollection {
        let association_criteria = association_criteria(criteria, property);

        let source = relationship
            .pointer("/links/related")
            .and_then(Value::as_str)
            .map(|link| strip_resource_path(link, context.api_resource_path()))
            .unwrap_or_default();

        let mut collection = EntityCollection::new(
            source,
            related_entity,
            context.clone(),
            association_criteria.clone(),
        );

        let Some(links) = relationship.get("data").and_then(Value::as_array) else {
            return collection;
        };

        for link in links {
            let (Some(entity_type), Some(id)) = (
                link.get("type").and_then(Value::as_str),
                link.get("id").and_then(Value::as_str),
            ) else {
                continue;
            };

            if let Some(cached) = cache.get(&format!("{entity_type}-{id}")) {
                collection.add(cached.clone());
                continue;
            }

            let Some(nested_row) = get_included(entity_type, id, response) else {
                debug!(entity = entity_type, id, "linked row missing from included, skipping");
                continue;
            };

            if let Some(nested) = self.hydrate_row(
                entity_type,
                nested_row,
                response,
                context,
                &association_criteria,
                registry,
                cache,
            ) {
                collection.add(nested);
            }
        }

        collection
    }

    /// Hydrates the `extensions` pseudo-relationship. Its row always sits in
    /// `included` under the synthetic type `extension`, keyed by the owning
    /// row's id, and its relationships resolve against the owner's schema.
    #[allow(clippy::too_many_arguments)]
    fn hydrate_extensions(
        &self,
        owner_id: &str,
        schema: &EntityDefinition,
        response: &Value,
        context: &ApiContext,
        criteria: &Criteria,
        registry: &SchemaRegistry,
        cache: &mut HydrationCache,
    ) -> BTreeMap<String, FieldValue> {
        let mut data: BTreeMap<String, FieldValue> = BTreeMap::new();

        let Some(extension_row) = get_included("extension", owner_id, response) else {
            debug!(owner = owner_id, "extension row missing from included");
            return data;
        };

        if let Some(attributes) = extension_row.get("attributes").and_then(Value::as_object) {
            for (key, value) in attributes {
                data.insert(key.clone(), FieldValue::Value(value.clone()));
            }
        }

        let Some(relationships) = extension_row.get("relationships").and_then(Value::as_object)
        else {
            return data;
        };

        for (property, relationship) in relationships {
            let Some(field) = schema.get_field(property) else {
                continue;
            };

            if field.is_to_many() {
                let collection = self.hydrate_to_many(
                    criteria,
                    property,
                    relationship,
                    field.entity.as_deref().unwrap_or_default(),
                    context,
                    response,
                    registry,
                    cache,
                );
                data.insert(property.clone(), FieldValue::Collection(collection));
            } else if field.is_to_one() && relationship.get("data").is_some_and(Value::is_object) {
                if let Some(nested) = self.hydrate_to_one(
                    criteria,
                    property,
                    relationship,
                    response,
                    context,
                    registry,
                    cache,
                ) {
                    data.insert(property.clone(), FieldValue::Entity(nested));
                }
            }
        }

        data
    }
}

/// The criteria to attach to a nested association: the parent's entry when
/// the association was requested, otherwise an empty default.
fn association_criteria(criteria: &Criteria, property: &str) -> Criteria {
    criteria
        .get_association(property)
        .cloned()
        .unwrap_or_default()
}

/// Finds a row in the response's `included` array by `(type, id)`.
fn get_included<'a>(entity_type: &str, id: &str, response: &'a Value) -> Option<&'a Value> {
    response
        .get("included")
        .and_then(Value::as_array)?
        .iter()
        .find(|included| {
            included.get("id").and_then(Value::as_str) == Some(id)
                && included.get("type").and_then(Value::as_str) == Some(entity_type)
        })
}

/// Some encodings can not distinguish an empty object from an empty array;
/// normalize against the schema's json field kind.
fn normalize_json_field(schema: &EntityDefinition, key: &str, value: &Value) -> Value {
    let Some(field) = schema.get_field(key) else {
        return value.clone();
    };

    if field.is_json_object() && value.as_array().is_some_and(Vec::is_empty) {
        return json!({});
    }

    if field.is_json_list() && value.as_object().is_some_and(|o| o.is_empty()) {
        return json!([]);
    }

    value.clone()
}

/// Strips the API resource path prefix from a relationship link, yielding
/// the collection's source route.
fn strip_resource_path(link: &str, resource_path: &str) -> String {
    if resource_path.is_empty() {
        return link.to_string();
    }
    match link.find(resource_path) {
        Some(index) => link[index + resource_path.len()..].to_string(),
        None => link.to_string(),
    }
}
