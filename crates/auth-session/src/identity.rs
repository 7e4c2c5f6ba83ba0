//! Identity provider abstraction.

use crate::AuthResult;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use session_storage::{StoredSession, UserProfile};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Upper bound on a reported token lifetime (one year).
const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 3600;

/// Token endpoint response.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

impl TokenSet {
    /// Build the persisted session.
    ///
    /// `previous` supplies the refresh token and id token when the provider
    /// does not rotate them on refresh.
    pub fn into_stored(self, profile: UserProfile, previous: Option<&StoredSession>) -> StoredSession {
        let expires_in = token_lifetime(self.expires_in);
        let expires_at = Utc::now() + Duration::seconds(expires_in);

        StoredSession {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            id_token: self
                .id_token
                .or_else(|| previous.and_then(|p| p.id_token.clone())),
            token_type: self.token_type,
            scope: self.scope.or_else(|| previous.and_then(|p| p.scope.clone())),
            expires_at: expires_at.to_rfc3339(),
            profile,
        }
    }
}

/// Lifetime in seconds to record for a token, kept within `0..=MAX_EXPIRES_IN_SECS`.
/// A negative value means the token is already expired.
fn token_lifetime(expires_in: Option<i64>) -> i64 {
    let secs = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    let clamped = secs.clamp(0, MAX_EXPIRES_IN_SECS);
    if clamped != secs {
        tracing::debug!(expires_in = secs, clamped, "Token lifetime out of range");
    }
    clamped
}

/// Parameters of one authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub redirect_uri: String,
    pub state: String,
    pub code_challenge: String,
}

/// Operations the session needs from an OpenID Connect provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the user agent is sent to for sign-in.
    async fn authorization_url(&self, request: &AuthorizationRequest) -> AuthResult<String>;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> AuthResult<TokenSet>;

    /// Obtain fresh tokens with a refresh token.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenSet>;

    /// Claims from the userinfo endpoint.
    async fn user_info(&self, access_token: &str) -> AuthResult<UserProfile>;

    /// RP-initiated logout URL, if the provider advertises one.
    async fn end_session_url(
        &self,
        id_token_hint: Option<&str>,
        post_logout_redirect_uri: Option<&str>,
    ) -> AuthResult<Option<String>>;
}

/// Read the profile claims from an id token payload.
///
/// The signature is not checked; the claims are only used to label the
/// session locally, never to authorize anything.
pub fn profile_from_id_token(id_token: &str) -> Option<UserProfile> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let profile: UserProfile = serde_json::from_slice(&bytes).ok()?;
    (!profile.sub.is_empty()).then_some(profile)
}
