//! API error types.

use serde_json::Value;
use shopkit_schema::SchemaError;
use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur when talking to the admin API.
///
/// Transport failures propagate unmodified; the only local recovery anywhere
/// in this crate is the transport's refresh-token-and-retry-once on 401.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; the body is preserved for inspection.
    #[error("request failed with status {status}")]
    Status { status: u16, body: Value },

    /// An operation required an auth token and none was present.
    #[error("authentication required")]
    AuthRequired,

    /// The token endpoint rejected a grant.
    #[error("authentication failed: {message}")]
    AuthFailed { message: String, body: Value },

    /// A batched sync response reported `success: false` despite a 2xx
    /// status; the raw body carries the item-level detail.
    #[error("sync operation failed")]
    SyncFailed { body: Value },

    /// Invalid arguments detected before any request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// Schema registry lookup failure.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Payload (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// The HTTP status of a `Status` error, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The response body attached to this error, if any.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. }
            | ApiError::AuthFailed { body, .. }
            | ApiError::SyncFailed { body } => Some(body),
            _ => None,
        }
    }
}
