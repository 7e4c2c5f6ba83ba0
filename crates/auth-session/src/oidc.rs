//! OpenID Connect client backed by provider discovery.

use crate::identity::{AuthorizationRequest, IdentityProvider, TokenSet};
use crate::pkce::PkceChallenge;
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use session_storage::UserProfile;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

/// Subset of the discovery document we rely on.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

/// OAuth error body (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OIDC public client (authorization code + PKCE).
pub struct OidcClient {
    http_client: Client,
    authority: String,
    client_id: String,
    scope: String,
    metadata: OnceCell<ProviderMetadata>,
}

impl OidcClient {
    pub fn new(authority: &str, client_id: &str, scope: &str) -> AuthResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            authority: authority.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
            metadata: OnceCell::new(),
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn discovery_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.authority)
    }

    /// Provider metadata, fetched once and cached.
    pub async fn metadata(&self) -> AuthResult<&ProviderMetadata> {
        self.metadata
            .get_or_try_init(|| async {
                let url = self.discovery_url();
                debug!(url = %url, "Fetching OIDC discovery document");

                let response = self.http_client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(AuthError::Discovery(format!(
                        "{} returned HTTP {}",
                        url,
                        response.status()
                    )));
                }

                let metadata: ProviderMetadata = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Discovery(e.to_string()))?;
                Ok(metadata)
            })
            .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> AuthResult<TokenSet> {
        let token_endpoint = self.metadata().await?.token_endpoint.clone();
        let grant_type = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map(|(_, v)| *v)
            .unwrap_or_default();
        debug!(url = %token_endpoint, grant_type, "Token request");

        let response = self
            .http_client
            .post(&token_endpoint)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(e) => match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                },
                Err(_) => body,
            };
            warn!(status = status.as_u16(), error = %error, grant_type, "Token request rejected");
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                error,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for OidcClient {
    async fn authorization_url(&self, request: &AuthorizationRequest) -> AuthResult<String> {
        let metadata = self.metadata().await?;
        let mut url = Url::parse(&metadata.authorization_endpoint)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &request.redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("state", &request.state)
            .append_pair("code_challenge", &request.code_challenge)
            .append_pair("code_challenge_method", PkceChallenge::METHOD);
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> AuthResult<TokenSet> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &self.client_id),
            ("code_verifier", code_verifier),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenSet> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("scope", &self.scope),
        ])
        .await
    }

    async fn user_info(&self, access_token: &str) -> AuthResult<UserProfile> {
        let endpoint = self
            .metadata()
            .await?
            .userinfo_endpoint
            .clone()
            .ok_or_else(|| AuthError::Discovery("provider has no userinfo endpoint".to_string()))?;

        let response = self
            .http_client
            .get(&endpoint)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn end_session_url(
        &self,
        id_token_hint: Option<&str>,
        post_logout_redirect_uri: Option<&str>,
    ) -> AuthResult<Option<String>> {
        let Some(endpoint) = self.metadata().await?.end_session_endpoint.as_deref() else {
            return Ok(None);
        };

        let mut url = Url::parse(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            if let Some(hint) = id_token_hint {
                query.append_pair("id_token_hint", hint);
            }
            if let Some(redirect) = post_logout_redirect_uri {
                query.append_pair("post_logout_redirect_uri", redirect);
            }
        }
        Ok(Some(url.into()))
    }
}
