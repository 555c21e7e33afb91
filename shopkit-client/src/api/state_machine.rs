//! State-machine transition endpoints.

use crate::api::{basic_headers, serialize_query};
use crate::error::ApiResult;
use crate::transport::HttpTransport;
use serde_json::{Value, json};
use shopkit_types::ApiContext;

/// Reads and triggers state-machine transitions on stateful entities
/// (orders, deliveries, payments).
#[derive(Clone, Debug)]
pub struct StateMachineApi {
    transport: HttpTransport,
}

impl StateMachineApi {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Lists the transitions currently available for an entity's state
    /// field.
    pub async fn available_transitions(
        &self,
        context: &ApiContext,
        entity_name: &str,
        entity_id: &str,
        state_field_name: Option<&str>,
    ) -> ApiResult<Value> {
        let query = serialize_query(&[("stateFieldName", state_field_name)]);
        let path = format!("/_action/state-machine/{entity_name}/{entity_id}/state?{query}");

        self.transport
            .get(context, &path, &basic_headers(context), None)
            .await
    }

    /// Triggers a named transition.
    pub async fn transition_state(
        &self,
        context: &ApiContext,
        entity_name: &str,
        entity_id: &str,
        transition: &str,
        state_field_name: Option<&str>,
    ) -> ApiResult<Value> {
        let query = serialize_query(&[("stateFieldName", state_field_name)]);
        let path = format!(
            "/_action/state-machine/{entity_name}/{entity_id}/state/{transition}?{query}"
        );

        self.transport
            .post(context, &path, &json!({}), &basic_headers(context), None)
            .await
    }
}
