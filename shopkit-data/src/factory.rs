//! Client-side creation of new entities.

use crate::{Criteria, Entity, EntityCollection, EntityRef, FieldValue};
use serde_json::Value;
use shopkit_schema::{SchemaRegistry, SchemaResult};
use shopkit_types::{ApiContext, create_id, route_segment};
use std::collections::BTreeMap;

/// Default paging attached to the empty association collections of a newly
/// created entity.
const NEW_COLLECTION_LIMIT: u64 = 10;

/// Builds new, client-side entities for a registered schema.
///
/// Every to-many association is pre-populated with an empty collection
/// pointed at its API route, so callers can add members before the entity
/// ever hits the server. Extension-flagged associations live under the
/// `extensions` container.
#[derive(Debug, Default)]
pub struct EntityFactory;

impl EntityFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a new entity of `entity_name`, marked as new. A missing id is
    /// generated client-side. Fails with `NotFound` for unregistered types.
    pub fn create(
        &self,
        registry: &SchemaRegistry,
        entity_name: &str,
        id: Option<String>,
        context: &ApiContext,
    ) -> SchemaResult<EntityRef> {
        let definition = registry.get(entity_name)?;
        let id = id.unwrap_or_else(create_id);

        let mut data: BTreeMap<String, FieldValue> = BTreeMap::new();
        let mut extensions: BTreeMap<String, FieldValue> = BTreeMap::new();

        for (property, field) in definition.to_many_associations() {
            let related = field.entity.as_deref().unwrap_or_default();

            if field.flags.extension {
                let source = format!("{id}/extensions");
                extensions.insert(
                    property.to_string(),
                    FieldValue::Collection(self.create_collection(
                        entity_name,
                        &source,
                        property,
                        related,
                        context,
                    )),
                );
            } else {
                data.insert(
                    property.to_string(),
                    FieldValue::Collection(self.create_collection(
                        entity_name,
                        &id,
                        property,
                        related,
                        context,
                    )),
                );
            }
        }

        data.insert("extensions".to_string(), FieldValue::Map(extensions));
        data.insert("id".to_string(), FieldValue::Value(Value::String(id.clone())));

        let mut entity = Entity::from_data(id, entity_name, data);
        entity.mark_as_new();

        Ok(EntityRef::new(entity))
    }

    fn create_collection(
        &self,
        entity: &str,
        id_path: &str,
        property: &str,
        related: &str,
        context: &ApiContext,
    ) -> EntityCollection {
        let source = format!(
            "/{}/{}/{}",
            route_segment(entity),
            id_path,
            route_segment(property)
        );

        let criteria = Criteria::with_paging(1, NEW_COLLECTION_LIMIT);

        EntityCollection::new(source, related, context.clone(), criteria)
    }
}
