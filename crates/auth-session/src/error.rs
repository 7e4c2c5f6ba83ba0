//! Authentication error types.

use std::sync::Arc;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No token resolver is registered with the TokenProvider
    #[error("Access token resolver has not been registered")]
    ResolverNotRegistered,

    /// Session not found
    #[error("Not logged in")]
    NotLoggedIn,

    /// Session exists but cannot be renewed without signing in again
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Silent renewal failed; shared by every caller awaiting that renewal
    #[error("Token renewal failed: {0}")]
    RenewalFailed(Arc<AuthError>),

    /// Authorization flow error (denied consent, missing code, ...)
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The `state` returned to the redirect URI does not match the request
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Token endpoint rejected the request
    #[error("Token endpoint returned HTTP {status}: {error}")]
    TokenEndpoint { status: u16, error: String },

    /// Provider metadata could not be discovered or is incomplete
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    /// Invalid state transition in the auth FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] session_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Connection failures and timeouts
    /// - HTTP errors with 5xx status codes
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Timeout => true,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            AuthError::TokenEndpoint { status, .. } => *status >= 500,
            AuthError::RenewalFailed(inner) => inner.is_transient(),
            _ => false,
        }
    }

    /// Returns true if the user has to sign in again interactively.
    pub fn requires_sign_in(&self) -> bool {
        match self {
            AuthError::NotLoggedIn | AuthError::NoRefreshToken => true,
            AuthError::RenewalFailed(_) => true,
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
