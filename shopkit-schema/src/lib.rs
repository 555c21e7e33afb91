//! Runtime entity schema for the shopkit data layer.
//!
//! The server describes every entity type it exposes in a schema document.
//! This crate holds the deserialized form of that document and the lookups
//! the rest of the stack is built on:
//! - [`FieldSchema`] — one field's type, relation and flags, with the
//!   classification predicates (scalar / json / to-one / to-many)
//! - [`EntityDefinition`] — an entity type's field map plus pure projections
//!   (primary keys, associations, required fields, …)
//! - [`SchemaRegistry`] — the per-process lookup table, populated once from
//!   the server's schema document before any entity is created or hydrated
//!
//! Unrecognized field types and relation kinds are kept as explicit
//! [`FieldType::Unknown`] / [`RelationKind::Unknown`] variants and reported
//! at registration time rather than silently dropped.

mod definition;
mod field;
mod registry;

pub use definition::EntityDefinition;
pub use field::{FieldFlags, FieldSchema, FieldType, RelationKind};
pub use registry::SchemaRegistry;

use thiserror::Error;

/// Result type for schema lookups.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised by schema lookups.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No definition registered under the requested entity name.
    #[error("entity '{0}' not found in schema registry")]
    NotFound(String),

    /// The registry has not been populated from the server's schema document.
    #[error("schema registry is empty, load the entity schema first")]
    Empty,
}
