//! OAuth grants and token acquisition.

use crate::error::{ApiError, ApiResult};
use crate::transport::{HttpTransport, TOKEN_ENDPOINT};
use serde::Deserialize;
use serde_json::{Value, json};
use shopkit_types::{ApiContext, AuthToken};

/// Client id the administration uses for password and refresh-token grants.
pub const ADMINISTRATION_CLIENT_ID: &str = "administration";

/// Access scope requested with a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantScope {
    UserVerified,
    Admin,
    Write,
}

impl GrantScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserVerified => "user-verified",
            Self::Admin => "admin",
            Self::Write => "write",
        }
    }
}

/// An OAuth grant for the token endpoint. The supported grant types are a
/// closed set; anything else is unrepresentable.
#[derive(Debug, Clone)]
pub enum GrantType {
    Password {
        username: String,
        password: String,
        scope: GrantScope,
    },
    ClientCredentials {
        client_id: String,
        client_secret: String,
        scope: GrantScope,
    },
    RefreshToken {
        refresh_token: String,
        scope: GrantScope,
    },
}

impl GrantType {
    /// Password grant with the administration client id and write scope.
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
            scope: GrantScope::Write,
        }
    }

    /// Client-credentials grant (integration access) with write scope.
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self::ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: GrantScope::Write,
        }
    }

    /// Refresh-token grant with the administration client id and write scope.
    pub fn refresh_token(refresh_token: impl Into<String>) -> Self {
        Self::RefreshToken {
            refresh_token: refresh_token.into(),
            scope: GrantScope::Write,
        }
    }

    /// Overrides the requested scope.
    #[must_use]
    pub fn with_scope(mut self, new_scope: GrantScope) -> Self {
        match &mut self {
            Self::Password { scope, .. }
            | Self::ClientCredentials { scope, .. }
            | Self::RefreshToken { scope, .. } => *scope = new_scope,
        }
        self
    }

    /// The token-endpoint request body for this grant.
    pub fn params(&self) -> Value {
        match self {
            Self::Password {
                username,
                password,
                scope,
            } => json!({
                "grant_type": "password",
                "client_id": ADMINISTRATION_CLIENT_ID,
                "scope": scope.as_str(),
                "username": username,
                "password": password,
            }),
            Self::ClientCredentials {
                client_id,
                client_secret,
                scope,
            } => json!({
                "grant_type": "client_credentials",
                "client_id": client_id,
                "scope": scope.as_str(),
                "client_secret": client_secret,
            }),
            Self::RefreshToken {
                refresh_token,
                scope,
            } => json!({
                "grant_type": "refresh_token",
                "client_id": ADMINISTRATION_CLIENT_ID,
                "scope": scope.as_str(),
                "refresh_token": refresh_token,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
}

/// Posts a grant to the token endpoint and maps the response into an
/// [`AuthToken`]. Token-endpoint rejections become [`ApiError::AuthFailed`]
/// carrying the response body.
pub async fn request_token(
    transport: &HttpTransport,
    context: &ApiContext,
    grant: &GrantType,
) -> ApiResult<AuthToken> {
    let headers = [
        ("Accept".to_string(), "application/vnd.api+json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ];

    let response = transport
        .post(context, TOKEN_ENDPOINT, &grant.params(), &headers, None)
        .await;

    let value = match response {
        Ok(value) => value,
        Err(ApiError::Status { body, .. }) => {
            return Err(ApiError::AuthFailed {
                message: "failed to fetch access token".to_string(),
                body,
            });
        }
        Err(error) => return Err(error),
    };

    let token: TokenResponse = serde_json::from_value(value)?;

    Ok(AuthToken::new(
        token.access_token,
        token.token_type.unwrap_or_else(|| "Bearer".to_string()),
        token.expires_in.unwrap_or(600),
        token.refresh_token,
    ))
}

/// Thin façade for token acquisition, mirroring the shape consumers expect
/// from the endpoint wrappers.
#[derive(Clone, Debug)]
pub struct AdminAuth {
    transport: HttpTransport,
}

impl AdminAuth {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Fetches an access token for the given grant.
    pub async fn fetch_access_token(
        &self,
        context: &ApiContext,
        grant: &GrantType,
    ) -> ApiResult<AuthToken> {
        request_token(&self.transport, context, grant).await
    }
}
