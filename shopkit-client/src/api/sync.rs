//! The batched sync endpoint.

use crate::api::basic_headers;
use crate::error::ApiResult;
use crate::transport::HttpTransport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shopkit_types::ApiContext;
use std::collections::BTreeMap;
use std::fmt;

/// Batch operation kind. The protocol knows exactly these two; anything else
/// is unrepresentable by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperator {
    Upsert,
    Delete,
}

impl SyncOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One batched operation: an action applied to a payload list of one entity
/// type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOperation {
    pub entity: String,
    pub action: SyncOperator,
    pub payload: Vec<Value>,
}

/// A sync request body: operations keyed `{entity}-{action}`, so one request
/// can combine upserts and deletes across entity types.
#[derive(Debug, Clone, Default)]
pub struct SyncPayload {
    operations: BTreeMap<String, SyncOperation>,
}

impl SyncPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the operation for `{entity}-{action}`.
    pub fn set_operator(
        &mut self,
        entity: impl Into<String>,
        action: SyncOperator,
        payload: Vec<Value>,
    ) -> &mut Self {
        let entity = entity.into();
        let key = format!("{entity}-{action}");
        self.operations.insert(
            key,
            SyncOperation {
                entity,
                action,
                payload,
            },
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// The wire body: a plain object keyed by operation key.
    pub fn to_payload(&self) -> Value {
        let map = self
            .operations
            .iter()
            .map(|(key, operation)| {
                // Serialize derives cannot fail for this shape.
                (
                    key.clone(),
                    serde_json::to_value(operation).unwrap_or_default(),
                )
            })
            .collect();
        Value::Object(map)
    }
}

/// `/_action/sync` wrapper.
#[derive(Clone, Debug)]
pub struct SyncApi {
    transport: HttpTransport,
}

impl SyncApi {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Posts a sync payload. Additional headers (`fail-on-error`,
    /// `single-operation`, …) are appended to the basic set.
    pub async fn sync(
        &self,
        context: &ApiContext,
        payload: &SyncPayload,
        additional_headers: &[(String, String)],
    ) -> ApiResult<Value> {
        let mut headers = basic_headers(context);
        headers.extend_from_slice(additional_headers);

        self.transport
            .post(context, "/_action/sync", &payload.to_payload(), &headers, None)
            .await
    }
}
