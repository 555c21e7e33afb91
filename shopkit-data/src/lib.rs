//! Entity model and data plumbing for the shopkit admin-API client.
//!
//! The pieces here turn relational JSON:API responses into a mutable,
//! dirty-tracked local entity graph, and reduce local mutations back into
//! minimal wire payloads:
//!
//! - [`Entity`] / [`EntityRef`] — a record with an immutable origin snapshot
//!   and a mutable draft, behind a shared handle so one logical entity in a
//!   response graph is one object
//! - [`EntityCollection`] — an ordered, typed sequence of entities carrying
//!   its source route, criteria and context
//! - [`Criteria`] — the declarative search descriptor
//! - [`EntityFactory`] — client-side creation of new entities
//! - [`EntityHydrator`] — response → entity graph, cycle-safe via a per-call
//!   identity cache
//! - [`ChangesetGenerator`] — entity graph → diff + association-deletion queue
//!
//! Network transport and the repository orchestration live in
//! `shopkit-client`.

mod changeset;
mod collection;
mod criteria;
mod entity;
mod factory;
mod hydrator;

pub use changeset::{Changeset, ChangesetGenerator, Deletion};
pub use collection::EntityCollection;
pub use criteria::{BoolOperator, Criteria, Filter, SortDirection, Sorting, TotalCountMode};
pub use entity::{Entity, EntityRef, FieldValue};
pub use factory::EntityFactory;
pub use hydrator::EntityHydrator;
