//! Shared leaf types for the shopkit admin-API client.
//!
//! This crate defines the small, dependency-light values every other shopkit
//! crate consumes:
//! - [`ApiContext`] — the explicitly passed per-call configuration (endpoint,
//!   auth token, language/currency/version scope)
//! - [`AuthToken`] — an OAuth access token with expiry tracking
//! - [`create_id`] — client-side entity id generation
//!
//! Nothing in here talks to the network; transport and auth negotiation live
//! in `shopkit-client`.

mod auth_token;
mod context;

pub use auth_token::AuthToken;
pub use context::{ApiContext, Defaults};

use uuid::Uuid;

/// Returns a new entity id: a UUID v4 in simple hex form (no separators),
/// the format the server expects for client-declared primary keys.
#[must_use]
pub fn create_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Maps an entity or field name to its URL segment: `product_manufacturer`
/// becomes `product-manufacturer`.
#[must_use]
pub fn route_segment(name: &str) -> String {
    name.replace('_', "-")
}
