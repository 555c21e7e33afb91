//! Per-entity repository: search and save orchestration.
//!
//! The repository wires the hydrator, the changeset generator and the
//! transport together. Reads go through the search endpoints and come back
//! hydrated; writes are reduced to a minimal diff and sent either as direct
//! REST calls or as batched sync operations, depending on the options.

use crate::error::{ApiError, ApiResult};
use crate::transport::HttpTransport;
use futures::future::{join_all, try_join_all};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use shopkit_data::{
    ChangesetGenerator, Criteria, Deletion, EntityCollection, EntityFactory, EntityHydrator,
    EntityRef, TotalCountMode,
};
use shopkit_schema::SchemaRegistry;
use shopkit_types::{ApiContext, route_segment};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default page size for [`Repository::iterate_ids`].
const ITERATE_PAGE_LIMIT: u64 = 50;

/// Per-repository configuration.
#[derive(Debug, Clone)]
pub struct RepositoryOptions {
    /// Optional API version tag, inserted into request paths as `/v{n}`.
    pub version: Option<String>,
    /// Write through the batched sync endpoint instead of direct REST.
    pub use_sync: bool,
    /// Value of the `sw-api-compatibility` header.
    pub compatibility: bool,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            version: None,
            use_sync: false,
            compatibility: true,
        }
    }
}

/// Result of an id search: total count and the matching ids.
#[derive(Debug, Clone, Deserialize)]
pub struct IdSearchResult {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub data: Vec<String>,
}

/// Search/save orchestration for one entity type.
#[derive(Debug)]
pub struct Repository {
    route: String,
    entity_name: String,
    registry: Arc<RwLock<SchemaRegistry>>,
    transport: HttpTransport,
    hydrator: EntityHydrator,
    changeset_generator: ChangesetGenerator,
    entity_factory: EntityFactory,
    options: RepositoryOptions,
}

impl Repository {
    pub fn new(
        entity_name: impl Into<String>,
        route: impl Into<String>,
        registry: Arc<RwLock<SchemaRegistry>>,
        transport: HttpTransport,
        options: RepositoryOptions,
    ) -> Self {
        Self {
            route: route.into(),
            entity_name: entity_name.into(),
            registry,
            transport,
            hydrator: EntityHydrator::new(),
            changeset_generator: ChangesetGenerator::new(),
            entity_factory: EntityFactory::new(),
            options,
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    // ── Read path ────────────────────────────────────────────────

    /// Searches for ids matching the criteria.
    pub async fn search_ids(
        &self,
        criteria: &Criteria,
        context: &ApiContext,
    ) -> ApiResult<IdSearchResult> {
        let url = format!("/search-ids{}", self.route);
        let response = self
            .transport
            .post(
                context,
                &url,
                &criteria.to_payload(),
                &self.build_headers(context),
                self.version(),
            )
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Searches and hydrates the matching entities.
    pub async fn search(
        &self,
        criteria: &Criteria,
        context: &ApiContext,
    ) -> ApiResult<EntityCollection> {
        let url = format!("/search{}", self.route);
        let response = self
            .transport
            .post(
                context,
                &url,
                &criteria.to_payload(),
                &self.build_headers(context),
                self.version(),
            )
            .await?;

        let registry = self.registry.read();
        Ok(self.hydrator.hydrate_search_result(
            &self.route,
            &self.entity_name,
            &response,
            context,
            criteria,
            &registry,
        ))
    }

    /// Fetches a single entity by id, or `None` when it does not exist.
    pub async fn get(
        &self,
        id: &str,
        context: &ApiContext,
        criteria: Option<Criteria>,
    ) -> ApiResult<Option<EntityRef>> {
        let mut criteria = criteria.unwrap_or_default();
        criteria.set_ids(vec![id.to_string()]);

        let result = self.search(&criteria, context).await?;
        Ok(result.get(id).cloned())
    }

    /// Pages through all ids matching the criteria, invoking `callback` per
    /// page, until a page comes back short.
    pub async fn iterate_ids<F, Fut>(
        &self,
        criteria: &Criteria,
        context: &ApiContext,
        mut callback: F,
    ) -> ApiResult<()>
    where
        F: FnMut(Vec<String>) -> Fut,
        Fut: Future<Output = ApiResult<()>>,
    {
        let mut criteria = criteria.clone();
        if criteria.limit().is_none() {
            criteria.set_limit(ITERATE_PAGE_LIMIT);
        }
        if criteria.page().is_none() {
            criteria.set_page(1);
        }
        criteria.set_total_count_mode(TotalCountMode::Exact);
        let limit = criteria.limit().unwrap_or(ITERATE_PAGE_LIMIT);

        loop {
            let result = self.search_ids(&criteria, context).await?;
            if result.data.is_empty() {
                return Ok(());
            }

            let count = result.data.len() as u64;
            callback(result.data).await?;

            if count < limit {
                return Ok(());
            }
            let page = criteria.page().unwrap_or(1);
            criteria.set_page(page + 1);
        }
    }

    // ── Write path ───────────────────────────────────────────────

    /// Detects all changes of the entity and sends them to the server:
    /// a POST for new entities, a PATCH otherwise, with queued association
    /// deletions sent first. With `use_sync` set, everything goes through
    /// one batched sync request instead. On success the entity's origin is
    /// replaced by the draft.
    pub async fn save(&self, entity: &EntityRef, context: &ApiContext) -> ApiResult<()> {
        if self.options.use_sync {
            self.save_with_sync(entity, context).await
        } else {
            self.save_with_rest(entity, context).await
        }
    }

    async fn save_with_rest(&self, entity: &EntityRef, context: &ApiContext) -> ApiResult<()> {
        let changeset = {
            let registry = self.registry.read();
            self.changeset_generator.generate(entity, &registry)?
        };
        let had_work =
            entity.is_new() || changeset.changes.is_some() || !changeset.deletion_queue.is_empty();

        self.send_deletions(&changeset.deletion_queue, context).await?;
        self.send_changes(entity, changeset.changes, context).await?;

        if had_work {
            entity.commit();
        }
        Ok(())
    }

    async fn save_with_sync(&self, entity: &EntityRef, context: &ApiContext) -> ApiResult<()> {
        let (changeset, primary) = {
            let registry = self.registry.read();
            let changeset = self.changeset_generator.generate(entity, &registry)?;
            let primary = self
                .changeset_generator
                .get_primary_key_data(entity, &registry)?;
            (changeset, primary)
        };

        let mut changes = changeset.changes;
        if entity.is_new() {
            changes.get_or_insert_with(Map::new);
        }
        // Upsert payloads must carry the primary key so the server can
        // target the row.
        if let Some(changes) = &mut changes {
            changes.insert("id".to_string(), Value::String(entity.id()));
            for (key, value) in primary {
                changes.insert(key, value);
            }
        }

        let mut operations = build_delete_operations(&changeset.deletion_queue);
        if let Some(changes) = &changes {
            operations.push(json!({
                "key": "write",
                "action": "upsert",
                "entity": self.entity_name,
                "payload": [changes],
            }));
        }

        if operations.is_empty() {
            return Ok(());
        }

        let mut headers = self.build_headers(context);
        headers.push(("single-operation".to_string(), "true".to_string()));

        self.transport
            .post(
                context,
                "/_action/sync",
                &Value::Array(operations),
                &headers,
                self.version(),
            )
            .await?;

        entity.commit();
        Ok(())
    }

    /// Saves every entity of the collection concurrently. All saves are
    /// awaited; one failure cancels nothing, the caller inspects each
    /// outcome.
    pub async fn save_all(
        &self,
        entities: &EntityCollection,
        context: &ApiContext,
    ) -> Vec<ApiResult<()>> {
        let saves: Vec<_> = entities
            .iter()
            .map(|entity| self.save(entity, context))
            .collect();
        join_all(saves).await
    }

    /// Batches the changes of all entities into at most two sync requests:
    /// one for all association deletions (grouped per entity type), one for
    /// all upserts. Upsert payloads carry the entity's primary-key data on
    /// top of the diff.
    pub async fn sync(
        &self,
        entities: &EntityCollection,
        context: &ApiContext,
        fail_on_error: bool,
    ) -> ApiResult<()> {
        let (upserts, deletions, touched) = {
            let registry = self.registry.read();

            let mut upserts: Vec<Map<String, Value>> = Vec::new();
            let mut deletions: Vec<Deletion> = Vec::new();
            let mut touched: Vec<EntityRef> = Vec::new();

            for entity in entities.iter() {
                let changeset = self.changeset_generator.generate(entity, &registry)?;
                let had_work =
                    changeset.changes.is_some() || !changeset.deletion_queue.is_empty();

                deletions.extend(changeset.deletion_queue);
                if let Some(mut changes) = changeset.changes {
                    let primary = self
                        .changeset_generator
                        .get_primary_key_data(entity, &registry)?;
                    for (key, value) in primary {
                        changes.insert(key, value);
                    }
                    upserts.push(changes);
                }
                if had_work {
                    touched.push(entity.clone());
                }
            }

            (upserts, deletions, touched)
        };

        self.send_sync_deletions(&deletions, fail_on_error, context)
            .await?;
        self.send_sync_upserts(&upserts, fail_on_error, context)
            .await?;

        for entity in touched {
            entity.commit();
        }
        Ok(())
    }

    /// Batch-deletes entities of this repository's type by id.
    pub async fn sync_deleted(&self, ids: &[String], context: &ApiContext) -> ApiResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let payload: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
        let body = sync_operation_body(&self.entity_name, "delete", payload);

        let mut headers = self.build_headers(context);
        headers.push(("fail-on-error".to_string(), "true".to_string()));

        let response = self
            .transport
            .post(context, "/_action/sync", &body, &headers, self.version())
            .await?;
        ensure_sync_success(response)
    }

    /// Deletes one entity by id.
    pub async fn delete(&self, id: &str, context: &ApiContext) -> ApiResult<()> {
        let url = format!("{}/{}", self.route, id);
        self.transport
            .delete(context, &url, &self.build_headers(context), self.version())
            .await?;
        Ok(())
    }

    /// Creates a many-to-many link. Only meaningful for repositories whose
    /// route already contains the owner, e.g. `/product/{id}/categories`;
    /// `id` is the associated entity's id.
    pub async fn assign(&self, id: &str, context: &ApiContext) -> ApiResult<Value> {
        self.transport
            .post(
                context,
                &self.route,
                &json!({ "id": id }),
                &self.build_headers(context),
                self.version(),
            )
            .await
    }

    /// Clones an existing entity server-side; `behavior` controls which
    /// associations are cloned along.
    pub async fn clone_entity(
        &self,
        id: &str,
        context: &ApiContext,
        behavior: &Value,
    ) -> ApiResult<Value> {
        if id.is_empty() {
            return Err(ApiError::Validation(
                "missing required argument: id".to_string(),
            ));
        }

        let url = format!("/_action/clone{}/{}", self.route, id);
        self.transport
            .post(context, &url, behavior, &self.build_headers(context), self.version())
            .await
    }

    // ── Local helpers ────────────────────────────────────────────

    /// Creates a new entity for this repository's schema; to-many
    /// associations come pre-populated with empty, API-pointed collections.
    pub fn create(&self, context: &ApiContext, id: Option<String>) -> ApiResult<EntityRef> {
        let registry = self.registry.read();
        Ok(self
            .entity_factory
            .create(&registry, &self.entity_name, id, context)?)
    }

    /// True when saving the entity would send anything.
    pub fn has_changes(&self, entity: &EntityRef) -> ApiResult<bool> {
        let registry = self.registry.read();
        let changeset = self.changeset_generator.generate(entity, &registry)?;
        Ok(!changeset.is_empty())
    }

    /// Resets the entity's changed top-level draft fields back to their
    /// origin values. Nested association drafts are not recursed into.
    pub fn discard(&self, entity: &EntityRef) -> ApiResult<()> {
        let changes = {
            let registry = self.registry.read();
            self.changeset_generator.generate(entity, &registry)?.changes
        };

        let Some(changes) = changes else {
            return Ok(());
        };
        for field in changes.keys() {
            entity.reset_field(field);
        }
        Ok(())
    }

    // ── Versioning ───────────────────────────────────────────────

    /// Creates a new version of the entity; the server generates id and name
    /// when omitted. Returns a context scoped to the new version.
    pub async fn create_version(
        &self,
        entity_id: &str,
        context: &ApiContext,
        version_id: Option<&str>,
        version_name: Option<&str>,
    ) -> ApiResult<ApiContext> {
        let mut params = Map::new();
        if let Some(version_id) = version_id {
            params.insert("versionId".to_string(), json!(version_id));
        }
        if let Some(version_name) = version_name {
            params.insert("versionName".to_string(), json!(version_name));
        }

        let url = format!(
            "/_action/version/{}/{}",
            route_segment(&self.entity_name),
            entity_id
        );
        let response = self
            .transport
            .post(
                context,
                &url,
                &Value::Object(params),
                &self.build_headers(context),
                self.version(),
            )
            .await?;

        #[derive(Deserialize)]
        struct VersionResponse {
            #[serde(rename = "versionId")]
            version_id: String,
        }
        let version: VersionResponse = serde_json::from_value(response)?;

        Ok(context.with_version_id(version.version_id))
    }

    /// Squashes all changes of the version into the live version and drops
    /// the version.
    pub async fn merge_version(&self, version_id: &str, context: &ApiContext) -> ApiResult<()> {
        let url = format!(
            "/_action/version/merge/{}/{}",
            route_segment(&self.entity_name),
            version_id
        );
        self.transport
            .post(
                context,
                &url,
                &json!({}),
                &self.build_headers(context),
                self.version(),
            )
            .await?;
        Ok(())
    }

    /// Drops a version, reverting all changes made in it.
    pub async fn delete_version(
        &self,
        entity_id: &str,
        version_id: &str,
        context: &ApiContext,
    ) -> ApiResult<()> {
        let url = format!(
            "/_action/version/{}/{}/{}",
            version_id,
            route_segment(&self.entity_name),
            entity_id
        );
        self.transport
            .post(
                context,
                &url,
                &json!({}),
                &self.build_headers(context),
                self.version(),
            )
            .await?;
        Ok(())
    }

    // ── Wire helpers ─────────────────────────────────────────────

    async fn send_changes(
        &self,
        entity: &EntityRef,
        changes: Option<Map<String, Value>>,
        context: &ApiContext,
    ) -> ApiResult<()> {
        let headers = self.build_headers(context);

        if entity.is_new() {
            let mut changes = changes.unwrap_or_default();
            changes.insert("id".to_string(), Value::String(entity.id()));

            self.transport
                .post(
                    context,
                    &self.route,
                    &Value::Object(changes),
                    &headers,
                    self.version(),
                )
                .await?;
            return Ok(());
        }

        let Some(changes) = changes else {
            return Ok(());
        };

        let url = format!("{}/{}", self.route, entity.id());
        self.transport
            .patch(context, &url, &Value::Object(changes), &headers, self.version())
            .await?;
        Ok(())
    }

    /// Issues one delete request per queued association removal, all
    /// concurrently; every one of them must succeed.
    async fn send_deletions(&self, queue: &[Deletion], context: &ApiContext) -> ApiResult<()> {
        if queue.is_empty() {
            return Ok(());
        }

        let headers = self.build_headers(context);
        let requests = queue.iter().map(|deletion| {
            let url = format!("{}/{}", deletion.route, deletion.key);
            let headers = headers.clone();
            async move {
                self.transport
                    .delete(context, &url, &headers, self.version())
                    .await
            }
        });

        try_join_all(requests).await?;
        Ok(())
    }

    async fn send_sync_upserts(
        &self,
        upserts: &[Map<String, Value>],
        fail_on_error: bool,
        context: &ApiContext,
    ) -> ApiResult<()> {
        if upserts.is_empty() {
            return Ok(());
        }

        let payload: Vec<Value> = upserts.iter().cloned().map(Value::Object).collect();
        let body = sync_operation_body(&self.entity_name, "upsert", payload);

        let mut headers = self.build_headers(context);
        headers.push(("fail-on-error".to_string(), fail_on_error.to_string()));

        let response = self
            .transport
            .post(context, "/_action/sync", &body, &headers, self.version())
            .await?;
        ensure_sync_success(response)
    }

    async fn send_sync_deletions(
        &self,
        deletions: &[Deletion],
        fail_on_error: bool,
        context: &ApiContext,
    ) -> ApiResult<()> {
        if deletions.is_empty() {
            return Ok(());
        }

        let mut body = Map::new();
        for (entity, payload) in group_deletions(deletions) {
            let mut operation = Map::new();
            operation.insert("entity".to_string(), Value::String(entity.clone()));
            operation.insert("action".to_string(), json!("delete"));
            operation.insert("payload".to_string(), Value::Array(payload));
            body.insert(entity, Value::Object(operation));
        }

        let mut headers = self.build_headers(context);
        headers.push(("fail-on-error".to_string(), fail_on_error.to_string()));

        let response = self
            .transport
            .post(
                context,
                "/_action/sync",
                &Value::Object(body),
                &headers,
                self.version(),
            )
            .await?;
        ensure_sync_success(response)
    }

    /// Builds the request headers: content negotiation, compatibility flag,
    /// auth token and the context's language/currency/version/inheritance
    /// scope.
    fn build_headers(&self, context: &ApiContext) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Accept".to_string(), "application/vnd.api+json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            (
                "sw-api-compatibility".to_string(),
                self.options.compatibility.to_string(),
            ),
        ];

        if let Some(token) = context.auth_token() {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", token.access_token),
            ));
        }
        if !context.language_id().is_empty() {
            headers.push(("sw-language-id".to_string(), context.language_id().to_string()));
        }
        if !context.currency_id().is_empty() {
            headers.push(("sw-currency-id".to_string(), context.currency_id().to_string()));
        }
        if !context.version_id().is_empty() {
            headers.push(("sw-version-id".to_string(), context.version_id().to_string()));
        }
        if context.inheritance() {
            headers.push(("sw-inheritance".to_string(), "true".to_string()));
        }

        headers
    }

    fn version(&self) -> Option<&str> {
        self.options.version.as_deref()
    }
}

/// Groups queued deletions per associated entity type, dropping entries
/// without one.
fn group_deletions(deletions: &[Deletion]) -> BTreeMap<String, Vec<Value>> {
    let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for deletion in deletions {
        if deletion.entity.is_empty() {
            continue;
        }
        grouped
            .entry(deletion.entity.clone())
            .or_default()
            .push(Value::Object(deletion.primary.clone()));
    }
    grouped
}

/// Delete operations for the single-entity sync save, one per entity type.
fn build_delete_operations(deletions: &[Deletion]) -> Vec<Value> {
    group_deletions(deletions)
        .into_iter()
        .map(|(entity, payload)| {
            json!({
                "action": "delete",
                "entity": entity,
                "payload": payload,
            })
        })
        .collect()
}

/// The `{ "<entity>": { entity, action, payload } }` sync body.
fn sync_operation_body(entity_name: &str, action: &str, payload: Vec<Value>) -> Value {
    let mut operation = Map::new();
    operation.insert("entity".to_string(), Value::String(entity_name.to_string()));
    operation.insert("action".to_string(), Value::String(action.to_string()));
    operation.insert("payload".to_string(), Value::Array(payload));

    let mut body = Map::new();
    body.insert(entity_name.to_string(), Value::Object(operation));
    Value::Object(body)
}

/// A 2xx sync response can still report per-item failure; normalize that
/// into an error carrying the raw body.
fn ensure_sync_success(response: Value) -> ApiResult<()> {
    if response.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::SyncFailed { body: response });
    }
    Ok(())
}
