//! OAuth token state.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Seconds an access token is considered valid when the server omits
/// `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 600;

/// Safety margin applied before the real expiry so a token is refreshed
/// slightly early rather than rejected mid-request.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// An OAuth access token as returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    /// Bearer token sent in the `Authorization` header.
    pub access_token: String,
    /// Token type, `Bearer` in practice.
    pub token_type: String,
    /// Lifetime in seconds, as reported by the server.
    pub expires_in: u64,
    /// Refresh token, absent for client-credentials grants.
    pub refresh_token: Option<String>,
    /// Instant the token was fetched; not part of the wire shape.
    #[serde(skip)]
    pub fetched_at: Option<SystemTime>,
}

impl AuthToken {
    /// Creates a token fetched now.
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: u64,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
            refresh_token,
            fetched_at: Some(SystemTime::now()),
        }
    }

    /// Returns true once the token is within the expiry buffer of its
    /// reported lifetime. Tokens without a fetch instant never expire
    /// locally; the server remains the authority.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let Some(fetched_at) = self.fetched_at else {
            return false;
        };
        let lifetime = Duration::from_secs(self.expires_in).saturating_sub(EXPIRY_BUFFER);
        match fetched_at.elapsed() {
            Ok(elapsed) => elapsed >= lifetime,
            Err(_) => false,
        }
    }
}
