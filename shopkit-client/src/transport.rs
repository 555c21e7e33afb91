//! HTTP transport: URL building, status mapping, 401 refresh-retry.

use crate::auth::{self, GrantType};
use crate::error::{ApiError, ApiResult};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use shopkit_types::{ApiContext, AuthToken};
use std::time::Duration;
use tracing::{debug, warn};

/// The OAuth token endpoint, exempt from 401 refresh handling so a failed
/// grant never triggers another refresh.
pub(crate) const TOKEN_ENDPOINT: &str = "/oauth/token";

const REFRESH_WHITELIST: &[&str] = &[TOKEN_ENDPOINT];

/// Thin wrapper around `reqwest::Client`.
///
/// Every request resolves its URL against the context's API endpoint; a
/// `version` tag inserts a `/v{n}` path segment. Non-2xx responses become
/// [`ApiError::Status`] with the parsed body attached. A 401 on a
/// non-whitelisted path is answered by refreshing the token through the
/// context's refresh token and retrying exactly once; callers never see the
/// first 401 when the refresh succeeds.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create HTTP client");
        Self { client }
    }

    pub async fn get(
        &self,
        context: &ApiContext,
        path: &str,
        headers: &[(String, String)],
        version: Option<&str>,
    ) -> ApiResult<Value> {
        self.request(context, Method::GET, path, None, headers, version)
            .await
    }

    pub async fn post(
        &self,
        context: &ApiContext,
        path: &str,
        body: &Value,
        headers: &[(String, String)],
        version: Option<&str>,
    ) -> ApiResult<Value> {
        self.request(context, Method::POST, path, Some(body), headers, version)
            .await
    }

    pub async fn patch(
        &self,
        context: &ApiContext,
        path: &str,
        body: &Value,
        headers: &[(String, String)],
        version: Option<&str>,
    ) -> ApiResult<Value> {
        self.request(context, Method::PATCH, path, Some(body), headers, version)
            .await
    }

    pub async fn delete(
        &self,
        context: &ApiContext,
        path: &str,
        headers: &[(String, String)],
        version: Option<&str>,
    ) -> ApiResult<Value> {
        self.request(context, Method::DELETE, path, None, headers, version)
            .await
    }

    async fn request(
        &self,
        context: &ApiContext,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: &[(String, String)],
        version: Option<&str>,
    ) -> ApiResult<Value> {
        let url = build_url(context.api_endpoint(), path, version);

        let response = self
            .execute(method.clone(), &url, body, headers, None)
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && context.auto_refresh()
            && !REFRESH_WHITELIST.contains(&path)
        {
            if let Some(token) = self.try_refresh_token(context).await {
                debug!(path, "retrying request with refreshed token");
                let retry = self
                    .execute(method, &url, body, headers, Some(&token.access_token))
                    .await?;
                return parse_response(retry).await;
            }
        }

        parse_response(response).await
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &[(String, String)],
        bearer_override: Option<&str>,
    ) -> ApiResult<Response> {
        let mut request = self.client.request(method, url);

        for (name, value) in headers {
            if bearer_override.is_some() && name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = bearer_override {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    /// Refreshes the context's token through its refresh token. Returns
    /// `None` (and leaves the original 401 to surface) when no refresh token
    /// is available or the refresh itself fails.
    async fn try_refresh_token(&self, context: &ApiContext) -> Option<AuthToken> {
        let refresh_token = context.auth_token()?.refresh_token?;
        let grant = GrantType::refresh_token(refresh_token);

        match Box::pin(auth::request_token(self, context, &grant)).await {
            Ok(token) => {
                context.set_auth_token(Some(token.clone()));
                Some(token)
            }
            Err(error) => {
                warn!(%error, "token refresh failed");
                None
            }
        }
    }
}

async fn parse_response(response: Response) -> ApiResult<Value> {
    let status = response.status();

    if status.is_success() {
        let text = response.text().await?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)));
    }

    let body = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&body).unwrap_or(Value::String(body));

    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

fn build_url(endpoint: &str, path: &str, version: Option<&str>) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match version {
        Some(version) => format!("{endpoint}/v{version}/{path}"),
        None => format!("{endpoint}/{path}"),
    }
}
