//! The entity record: origin snapshot, working draft, dirty tracking.
//!
//! Field access is an explicit key-value store with typed slots rather than
//! dynamic property interception. Association fields hold further entities
//! or collections, recursively carrying the same origin/draft structure.

use crate::EntityCollection;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One field slot of an entity's origin or draft.
#[derive(Clone, Debug)]
pub enum FieldValue {
    /// Scalar or json field payload.
    Value(Value),
    /// A to-one association.
    Entity(EntityRef),
    /// A to-many association.
    Collection(EntityCollection),
    /// The extensions container: extension field name → slot.
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Snapshot for the origin side: deep for plain values, shallow (shared
    /// reference) for association slots.
    #[must_use]
    pub fn snapshot(&self) -> FieldValue {
        match self {
            Self::Value(v) => Self::Value(v.clone()),
            Self::Entity(e) => Self::Entity(e.clone()),
            Self::Collection(c) => Self::Collection(c.clone()),
            Self::Map(m) => Self::Map(m.iter().map(|(k, v)| (k.clone(), v.snapshot())).collect()),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&EntityCollection> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<EntityRef> for FieldValue {
    fn from(entity: EntityRef) -> Self {
        Self::Entity(entity)
    }
}

impl From<EntityCollection> for FieldValue {
    fn from(collection: EntityCollection) -> Self {
        Self::Collection(collection)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Value(Value::from(value))
    }
}

/// A typed, identity-bearing record with a last-synced snapshot (`origin`)
/// and a working copy (`draft`).
///
/// `is_new` is true until the first successful save; `is_dirty` is set by
/// field assignment and cleared only when the origin is replaced via
/// [`Entity::commit`].
pub struct Entity {
    id: String,
    entity_type: String,
    origin: BTreeMap<String, FieldValue>,
    draft: BTreeMap<String, FieldValue>,
    is_new: bool,
    is_dirty: bool,
}

impl Entity {
    /// Creates an entity whose origin is a snapshot of `data`. Used by the
    /// factory and the hydrator; entities start clean and not-new.
    pub fn from_data(
        id: impl Into<String>,
        entity_type: impl Into<String>,
        data: BTreeMap<String, FieldValue>,
    ) -> Self {
        let origin = data.iter().map(|(k, v)| (k.clone(), v.snapshot())).collect();
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            origin,
            draft: data,
            is_new: false,
            is_dirty: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The entity type name, e.g. `product`.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Marks the entity as new; new entities are sent as create requests.
    pub fn mark_as_new(&mut self) {
        self.is_new = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Reads a draft field.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.draft.get(field)
    }

    /// Reads an origin field (the value last synchronized with the server).
    pub fn origin_value(&self, field: &str) -> Option<&FieldValue> {
        self.origin.get(field)
    }

    /// Writes a draft field and marks the entity dirty.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.draft.insert(field.into(), value.into());
        self.is_dirty = true;
    }

    /// The full working copy.
    pub fn draft(&self) -> &BTreeMap<String, FieldValue> {
        &self.draft
    }

    /// The full origin snapshot.
    pub fn origin(&self) -> &BTreeMap<String, FieldValue> {
        &self.origin
    }

    pub(crate) fn draft_mut(&mut self) -> &mut BTreeMap<String, FieldValue> {
        &mut self.draft
    }

    /// Writes a field into draft and origin alike, without dirtying.
    /// Hydration uses this: server state is clean by definition.
    pub(crate) fn insert_persistent(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        self.origin.insert(field.clone(), value.snapshot());
        self.draft.insert(field, value);
    }

    /// Resets one draft field back to its origin value. Fields absent from
    /// the origin are removed from the draft.
    pub fn reset_field(&mut self, field: &str) {
        match self.origin.get(field) {
            Some(value) => {
                self.draft.insert(field.to_string(), value.snapshot());
            }
            None => {
                self.draft.remove(field);
            }
        }
    }

    /// Replaces the origin with a snapshot of the draft and clears the
    /// new/dirty markers. Called after a successful save so subsequent
    /// change detection starts from the synchronized state.
    pub fn commit(&mut self) {
        self.origin = self
            .draft
            .iter()
            .map(|(k, v)| (k.clone(), v.snapshot()))
            .collect();
        self.is_new = false;
        self.is_dirty = false;
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("entity_type", &self.entity_type)
            .field("is_new", &self.is_new)
            .field("is_dirty", &self.is_dirty)
            .field("fields", &self.draft.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Shared handle to an [`Entity`].
///
/// Hydration may surface the same logical entity in several places of one
/// response graph; all of them resolve to the same handle, so a mutation is
/// visible everywhere and cyclic graphs stay finite. Identity is pointer
/// identity ([`EntityRef::ptr_eq`]).
#[derive(Clone)]
pub struct EntityRef(Arc<RwLock<Entity>>);

impl EntityRef {
    pub fn new(entity: Entity) -> Self {
        Self(Arc::new(RwLock::new(entity)))
    }

    pub fn id(&self) -> String {
        self.0.read().id().to_string()
    }

    pub fn entity_type(&self) -> String {
        self.0.read().entity_type().to_string()
    }

    pub fn is_new(&self) -> bool {
        self.0.read().is_new()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.read().is_dirty()
    }

    pub fn mark_as_new(&self) {
        self.0.write().mark_as_new();
    }

    /// Reads a draft field (cloned slot; association slots stay shared).
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.0.read().get(field).cloned()
    }

    /// Reads an origin field.
    pub fn origin_value(&self, field: &str) -> Option<FieldValue> {
        self.0.read().origin_value(field).cloned()
    }

    /// Writes a draft field and marks the entity dirty.
    pub fn set(&self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.write().set(field, value);
    }

    /// Extracts a string draft field.
    pub fn get_str(&self, field: &str) -> Option<String> {
        self.0
            .read()
            .get(field)
            .and_then(FieldValue::as_value)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Extracts a boolean draft field.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.0
            .read()
            .get(field)
            .and_then(FieldValue::as_value)
            .and_then(Value::as_bool)
    }

    /// Extracts a numeric draft field.
    pub fn get_number(&self, field: &str) -> Option<f64> {
        self.0
            .read()
            .get(field)
            .and_then(FieldValue::as_value)
            .and_then(Value::as_f64)
    }

    /// Runs `f` against the named to-many draft collection in place.
    /// Returns `None` when the field is absent or not a collection.
    pub fn with_collection<R>(
        &self,
        field: &str,
        f: impl FnOnce(&mut EntityCollection) -> R,
    ) -> Option<R> {
        let mut guard = self.0.write();
        match guard.draft_mut().get_mut(field) {
            Some(FieldValue::Collection(collection)) => Some(f(collection)),
            _ => None,
        }
    }

    /// Runs `f` against a to-many draft collection inside the extensions
    /// container. Returns `None` when no such collection exists.
    pub fn with_extension_collection<R>(
        &self,
        field: &str,
        f: impl FnOnce(&mut EntityCollection) -> R,
    ) -> Option<R> {
        let mut guard = self.0.write();
        match guard.draft_mut().get_mut("extensions") {
            Some(FieldValue::Map(extensions)) => match extensions.get_mut(field) {
                Some(FieldValue::Collection(collection)) => Some(f(collection)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Resets one draft field back to its origin value.
    pub fn reset_field(&self, field: &str) {
        self.0.write().reset_field(field);
    }

    /// See [`Entity::commit`].
    pub fn commit(&self) {
        self.0.write().commit();
    }

    /// Read access to the underlying record.
    pub fn read(&self) -> RwLockReadGuard<'_, Entity> {
        self.0.read()
    }

    /// Write access to the underlying record.
    pub fn write(&self) -> RwLockWriteGuard<'_, Entity> {
        self.0.write()
    }

    /// True when both handles point at the identical entity object.
    pub fn ptr_eq(a: &EntityRef, b: &EntityRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn ptr_key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub(crate) fn insert_persistent(&self, field: impl Into<String>, value: FieldValue) {
        self.0.write().insert_persistent(field, value);
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow on purpose: a cyclic graph must not recurse here.
        match self.0.try_read() {
            Some(guard) => write!(f, "EntityRef({}:{})", guard.entity_type(), guard.id()),
            None => write!(f, "EntityRef(<locked>)"),
        }
    }
}
