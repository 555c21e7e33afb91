//! Application bootstrap: context, schema load, authentication.

use crate::api::InfoApi;
use crate::auth::{GrantType, request_token};
use crate::error::ApiResult;
use crate::repository::{Repository, RepositoryOptions};
use crate::transport::HttpTransport;
use parking_lot::RwLock;
use shopkit_schema::{SchemaError, SchemaRegistry};
use shopkit_types::{ApiContext, AuthToken, route_segment};
use std::sync::Arc;
use tracing::info;

/// Options for [`Application::new`].
#[derive(Debug, Clone)]
pub struct ApplicationOptions {
    pub shop_url: String,
    pub api_path: String,
    pub auto_refresh: bool,
}

impl ApplicationOptions {
    /// Options for a shop URL with the default `/api` path and automatic
    /// token refresh.
    pub fn new(shop_url: impl Into<String>) -> Self {
        Self {
            shop_url: shop_url.into(),
            api_path: "/api".to_string(),
            auto_refresh: true,
        }
    }

    #[must_use]
    pub fn api_path(mut self, api_path: impl Into<String>) -> Self {
        self.api_path = api_path.into();
        self
    }

    #[must_use]
    pub fn auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }
}

/// Entry point tying a context, a transport and the schema registry
/// together.
///
/// The registry must be populated before entities can be created or
/// hydrated: [`Application::load_entity_schema`] fetches the server's schema
/// document once, and [`Application::repository`] refuses to hand out
/// repositories while the registry is empty.
pub struct Application {
    context: ApiContext,
    transport: HttpTransport,
    registry: Arc<RwLock<SchemaRegistry>>,
}

impl Application {
    pub fn new(options: ApplicationOptions) -> Self {
        let mut context = ApiContext::new(&options.shop_url, &options.api_path);
        context.set_auto_refresh(options.auto_refresh);
        Self::from_context(context)
    }

    /// Builds an application around an existing context.
    pub fn from_context(context: ApiContext) -> Self {
        Self {
            context,
            transport: HttpTransport::new(),
            registry: Arc::new(RwLock::new(SchemaRegistry::new())),
        }
    }

    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    pub fn registry(&self) -> Arc<RwLock<SchemaRegistry>> {
        self.registry.clone()
    }

    /// Loads the entity schema document into the registry, once. Subsequent
    /// calls on a populated registry are no-ops.
    pub async fn load_entity_schema(&self) -> ApiResult<()> {
        if !self.registry.read().is_empty() {
            return Ok(());
        }

        let document = InfoApi::new(self.transport.clone())
            .entity_schema(&self.context)
            .await?;
        info!(entities = document.len(), "loaded entity schema");

        let mut registry = self.registry.write();
        for (name, definition) in document {
            registry.add(name, definition);
        }
        Ok(())
    }

    /// Fetches an access token for the grant, stores it in the context and
    /// loads the entity schema.
    pub async fn authenticate(&self, grant: &GrantType) -> ApiResult<AuthToken> {
        let token = request_token(&self.transport, &self.context, grant).await?;
        self.set_auth_token(Some(token.clone())).await?;
        Ok(token)
    }

    /// Replaces the context's token. Setting a token also ensures the entity
    /// schema is loaded.
    pub async fn set_auth_token(&self, token: Option<AuthToken>) -> ApiResult<()> {
        let has_token = token.is_some();
        self.context.set_auth_token(token);
        if has_token {
            self.load_entity_schema().await?;
        }
        Ok(())
    }

    /// A repository for `entity_name` on its default route.
    pub fn repository(&self, entity_name: &str) -> ApiResult<Repository> {
        self.repository_with_options(entity_name, None, RepositoryOptions::default())
    }

    /// A repository with an explicit route and options. Fails while the
    /// registry is still empty, or when the entity type is unknown.
    pub fn repository_with_options(
        &self,
        entity_name: &str,
        route: Option<String>,
        options: RepositoryOptions,
    ) -> ApiResult<Repository> {
        {
            let registry = self.registry.read();
            if registry.is_empty() {
                return Err(SchemaError::Empty.into());
            }
            registry.get(entity_name)?;
        }

        let route = route.unwrap_or_else(|| format!("/{}", route_segment(entity_name)));
        Ok(Repository::new(
            entity_name,
            route,
            self.registry.clone(),
            self.transport.clone(),
            options,
        ))
    }
}
