//! Server information endpoints.

use crate::api::basic_headers;
use crate::error::ApiResult;
use crate::transport::HttpTransport;
use serde_json::Value;
use shopkit_schema::EntityDefinition;
use shopkit_types::ApiContext;
use std::collections::BTreeMap;

/// `/_info/*` endpoints, most importantly the entity schema document the
/// registry is bootstrapped from.
#[derive(Clone, Debug)]
pub struct InfoApi {
    transport: HttpTransport,
}

impl InfoApi {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Fetches the full entity schema document (entity name → definition).
    pub async fn entity_schema(
        &self,
        context: &ApiContext,
    ) -> ApiResult<BTreeMap<String, EntityDefinition>> {
        let value = self
            .transport
            .get(
                context,
                "/_info/entity-schema.json",
                &basic_headers(context),
                None,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetches the OpenAPI 3 document.
    pub async fn open_api(&self, context: &ApiContext) -> ApiResult<Value> {
        self.transport
            .get(context, "/_info/openapi3.json", &basic_headers(context), None)
            .await
    }

    /// Fetches the business event listing.
    pub async fn events(&self, context: &ApiContext) -> ApiResult<Value> {
        self.transport
            .get(context, "/_info/events.json", &basic_headers(context), None)
            .await
    }

    /// Fetches the instance configuration.
    pub async fn config(&self, context: &ApiContext) -> ApiResult<Value> {
        self.transport
            .get(context, "/_info/config", &basic_headers(context), None)
            .await
    }

    /// Fetches the server version.
    pub async fn version(&self, context: &ApiContext) -> ApiResult<Value> {
        self.transport
            .get(context, "/_info/version", &basic_headers(context), None)
            .await
    }
}
