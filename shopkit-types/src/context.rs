//! Per-call API configuration.
//!
//! The original system kept a process-wide mutable context; here the context
//! is an explicit value threaded through every call that needs it, so several
//! shop/tenant scopes can coexist in one process. Clones share the auth-token
//! cell: a token refreshed through one clone is visible to all of them.

use crate::AuthToken;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Well-known server-side default identifiers.
pub struct Defaults;

impl Defaults {
    /// The system language id every installation ships with.
    pub const SYSTEM_LANGUAGE_ID: &'static str = "2fbb5fe2e29a4d70aa5854ce7ce3e20b";
    /// The default currency id.
    pub const CURRENCY_ID: &'static str = "b7d2554b0ce847cd82f3ac9bd1c0dfca";
    /// The live version id; versioned reads/writes override this.
    pub const LIVE_VERSION_ID: &'static str = "0fa91ce3e96a4bc2be4bd9ce752c3425";
}

/// Configuration scope for API calls: endpoint, auth token and the
/// language/currency/version identifiers folded into request headers.
#[derive(Clone)]
pub struct ApiContext {
    api_endpoint: String,
    api_resource_path: String,
    auth_token: Arc<RwLock<Option<AuthToken>>>,
    language_id: String,
    currency_id: String,
    version_id: String,
    compatibility: bool,
    inheritance: bool,
    auto_refresh: bool,
}

impl Default for ApiContext {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            api_resource_path: String::new(),
            auth_token: Arc::new(RwLock::new(None)),
            language_id: Defaults::SYSTEM_LANGUAGE_ID.to_string(),
            currency_id: Defaults::CURRENCY_ID.to_string(),
            version_id: Defaults::LIVE_VERSION_ID.to_string(),
            compatibility: true,
            inheritance: true,
            auto_refresh: true,
        }
    }
}

impl ApiContext {
    /// Creates a context pointing at `shop_url` + `api_path`
    /// (e.g. `https://shop.example.com` + `/api`).
    pub fn new(shop_url: &str, api_path: &str) -> Self {
        let mut ctx = Self::default();
        ctx.set_api_endpoint(shop_url, api_path);
        ctx.set_api_resource_path(shop_url, api_path);
        ctx
    }

    /// The fully resolved API base URL requests are issued against.
    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    pub fn set_api_endpoint(&mut self, shop_url: &str, api_path: &str) {
        self.api_endpoint = join_url(shop_url, api_path);
    }

    /// The resource path prefix stripped from relationship links during
    /// hydration.
    pub fn api_resource_path(&self) -> &str {
        &self.api_resource_path
    }

    pub fn set_api_resource_path(&mut self, shop_url: &str, api_path: &str) {
        self.api_resource_path = join_url(shop_url, api_path);
    }

    /// Returns a clone of the current auth token, if any.
    pub fn auth_token(&self) -> Option<AuthToken> {
        self.auth_token.read().clone()
    }

    /// Replaces the auth token. Visible to every clone of this context.
    pub fn set_auth_token(&self, token: Option<AuthToken>) {
        *self.auth_token.write() = token;
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn set_language_id(&mut self, value: impl Into<String>) {
        self.language_id = value.into();
    }

    pub fn currency_id(&self) -> &str {
        &self.currency_id
    }

    pub fn set_currency_id(&mut self, value: impl Into<String>) {
        self.currency_id = value.into();
    }

    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    pub fn set_version_id(&mut self, value: impl Into<String>) {
        self.version_id = value.into();
    }

    /// Returns a clone of this context scoped to the given entity version.
    /// The token cell stays shared.
    #[must_use]
    pub fn with_version_id(&self, version_id: impl Into<String>) -> Self {
        let mut ctx = self.clone();
        ctx.version_id = version_id.into();
        ctx
    }

    pub fn compatibility(&self) -> bool {
        self.compatibility
    }

    pub fn set_compatibility(&mut self, value: bool) {
        self.compatibility = value;
    }

    pub fn inheritance(&self) -> bool {
        self.inheritance
    }

    pub fn set_inheritance(&mut self, value: bool) {
        self.inheritance = value;
    }

    /// Whether the transport may refresh the token and retry once on a 401.
    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn set_auto_refresh(&mut self, value: bool) {
        self.auto_refresh = value;
    }
}

impl fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiContext")
            .field("api_endpoint", &self.api_endpoint)
            .field("api_resource_path", &self.api_resource_path)
            .field("has_auth_token", &self.auth_token.read().is_some())
            .field("language_id", &self.language_id)
            .field("currency_id", &self.currency_id)
            .field("version_id", &self.version_id)
            .field("compatibility", &self.compatibility)
            .field("inheritance", &self.inheritance)
            .field("auto_refresh", &self.auto_refresh)
            .finish()
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
