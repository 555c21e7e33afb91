//! Thin endpoint wrappers over the transport.
//!
//! Each wrapper takes the [`ApiContext`](shopkit_types::ApiContext) per call
//! and folds it into the basic headers; none of them carry state beyond the
//! transport handle.

mod info;
mod state_machine;
mod sync;
mod user;

pub use info::InfoApi;
pub use state_machine::StateMachineApi;
pub use sync::{SyncApi, SyncOperation, SyncOperator, SyncPayload};
pub use user::UserApi;

use shopkit_types::ApiContext;

/// Basic headers for authenticated API calls: content negotiation plus the
/// bearer token when one is present.
pub(crate) fn basic_headers(context: &ApiContext) -> Vec<(String, String)> {
    let mut headers = vec![
        ("Accept".to_string(), "application/vnd.api+json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ];

    if let Some(token) = context.auth_token() {
        headers.push((
            "Authorization".to_string(),
            format!("Bearer {}", token.access_token),
        ));
    }

    headers
}

/// Serializes optional query parameters, skipping absent ones.
pub(crate) fn serialize_query(params: &[(&str, Option<&str>)]) -> String {
    let parts: Vec<String> = params
        .iter()
        .filter_map(|(name, value)| {
            value.map(|value| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
        })
        .collect();
    parts.join("&")
}
