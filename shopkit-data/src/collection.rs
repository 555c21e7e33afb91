//! The typed entity collection.

use crate::{Criteria, EntityRef};
use serde_json::Value;
use shopkit_types::ApiContext;

/// An ordered sequence of entities plus the route, type, criteria and
/// context it was fetched under, with the top-level result's total count and
/// aggregations when present.
///
/// Structural operations preserve the typed wrapper: [`EntityCollection::filter`]
/// returns another collection carrying the same route/type/context, never a
/// plain vector. Ids are not deduplicated unless an operation says so.
#[derive(Clone, Debug)]
pub struct EntityCollection {
    source: String,
    entity_type: String,
    context: ApiContext,
    criteria: Criteria,
    items: Vec<EntityRef>,
    aggregations: Option<Value>,
    total: Option<u64>,
}

impl EntityCollection {
    /// Creates an empty collection pointed at an API source route.
    pub fn new(
        source: impl Into<String>,
        entity_type: impl Into<String>,
        context: ApiContext,
        criteria: Criteria,
    ) -> Self {
        Self::with_items(source, entity_type, context, criteria, Vec::new(), None, None)
    }

    /// Creates a populated collection, as the hydrator does for search
    /// results.
    pub fn with_items(
        source: impl Into<String>,
        entity_type: impl Into<String>,
        context: ApiContext,
        criteria: Criteria,
        items: Vec<EntityRef>,
        aggregations: Option<Value>,
        total: Option<u64>,
    ) -> Self {
        Self {
            source: source.into(),
            entity_type: entity_type.into(),
            context,
            criteria,
            items,
            aggregations,
            total,
        }
    }

    /// The API route this collection was (or will be) fetched from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Total row count reported by the top-level search result. Nested
    /// association collections never carry one.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn set_total(&mut self, total: Option<u64>) {
        self.total = total;
    }

    pub fn aggregations(&self) -> Option<&Value> {
        self.aggregations.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[EntityRef] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.items.iter()
    }

    /// First item, `None` when empty.
    pub fn first(&self) -> Option<&EntityRef> {
        self.items.first()
    }

    /// Last item, `None` when empty.
    pub fn last(&self) -> Option<&EntityRef> {
        self.items.last()
    }

    /// The entity with the given id, if present.
    pub fn get(&self, id: &str) -> Option<&EntityRef> {
        self.items.iter().find(|e| e.id() == id)
    }

    /// The entity at the given index, if in range.
    pub fn get_at(&self, index: usize) -> Option<&EntityRef> {
        self.items.get(index)
    }

    /// True when an entity with the given id is present.
    pub fn has(&self, id: &str) -> bool {
        self.items.iter().any(|e| e.id() == id)
    }

    /// Ids of all contained entities, in order.
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(EntityRef::id).collect()
    }

    /// Appends an entity.
    pub fn add(&mut self, entity: EntityRef) {
        self.items.push(entity);
    }

    /// Inserts an entity at the given position; positions past the end
    /// append.
    pub fn add_at(&mut self, entity: EntityRef, index: usize) {
        let index = index.min(self.items.len());
        self.items.insert(index, entity);
    }

    /// Removes the entity with the given id. Returns true if one was
    /// removed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.items.iter().position(|e| e.id() == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Moves the item at `old_index` to `new_index`, shifting the rest.
    /// Returns the moved entity, or `None` (leaving the collection
    /// untouched) when `old_index` is out of range. `new_index` clamps to
    /// the tail.
    pub fn move_item(&mut self, old_index: usize, new_index: usize) -> Option<EntityRef> {
        if old_index >= self.items.len() {
            return None;
        }
        let moved = self.items.remove(old_index);
        let new_index = new_index.min(self.items.len());
        self.items.insert(new_index, moved.clone());
        Some(moved)
    }

    /// Filters into a new collection, preserving the typed wrapper and
    /// propagating route, type, context, criteria, aggregations and total.
    #[must_use]
    pub fn filter(&self, mut predicate: impl FnMut(&EntityRef) -> bool) -> EntityCollection {
        let filtered = self
            .items
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect();
        Self {
            source: self.source.clone(),
            entity_type: self.entity_type.clone(),
            context: self.context.clone(),
            criteria: self.criteria.clone(),
            items: filtered,
            aggregations: self.aggregations.clone(),
            total: self.total,
        }
    }

    /// Branches a collection: same contents and metadata, criteria cloned so
    /// the branch can diverge without aliasing.
    #[must_use]
    pub fn from_collection(collection: &EntityCollection) -> EntityCollection {
        collection.clone()
    }
}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = &'a EntityRef;
    type IntoIter = std::slice::Iter<'a, EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
