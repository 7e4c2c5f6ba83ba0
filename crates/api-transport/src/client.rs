//! The single choke point for calls to the storefront backend.
//!
//! Every call goes through [`ApiClient::send`]:
//!
//! 1. Attach `Authorization: Bearer <token>` from the [`TokenProvider`]
//!    unless the request opted out. A provider that is not ready, or a
//!    token that cannot be resolved, sends the request without a token.
//! 2. Dispatch. A 2xx response is returned untouched.
//! 3. On a 401 for the initial attempt, resolve a fresh token and
//!    re-dispatch once. A second 401, or a failed resolve, is terminal.
//! 4. Everything else becomes an [`HttpError`].

use crate::error::{ClientError, ClientResult};
use crate::request::{ApiRequest, Attempt, RequestContext};
use crate::response::ApiResponse;
use auth_session::{AccessToken, TokenProvider};
use client_config_and_utils::{normalize_base_url, Config};
use http_problem::{HttpError, MessageCatalog, ProblemDetail};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of one dispatch.
enum Dispatch {
    Success(ApiResponse),
    NoResponse,
    Failed { status: u16, problem: ProblemDetail },
}

/// Authenticated JSON client for the storefront REST API.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenProvider>,
    catalog: Arc<MessageCatalog>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: Arc<TokenProvider>,
        catalog: Arc<MessageCatalog>,
    ) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url),
            tokens,
            catalog,
        })
    }

    /// Build from the loaded configuration.
    pub fn from_config(
        config: &Config,
        tokens: Arc<TokenProvider>,
        catalog: Arc<MessageCatalog>,
    ) -> ClientResult<Self> {
        let base_url = config.api_base_url()?;
        Self::new(base_url.as_str(), config.request_timeout(), tokens, catalog)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn catalog(&self) -> &Arc<MessageCatalog> {
        &self.catalog
    }

    pub fn token_provider(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request through the auth and retry pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let url = self.url_for(&request.path);
        let mut attempt = Attempt::Initial;
        let mut token = self.authorize(&request, &url).await;

        loop {
            let ctx = RequestContext::new(&request, url.clone(), attempt);

            let (status, problem) = match self.dispatch(&request, &ctx, token.as_ref()).await {
                Dispatch::Success(response) => return Ok(response),
                Dispatch::NoResponse => {
                    return Err(HttpError::network(&self.catalog)
                        .with_request(ctx.method.as_str(), &ctx.url))
                }
                Dispatch::Failed { status, problem } => (status, problem),
            };

            if status != 401 {
                return Err(HttpError::from_response(status, problem)
                    .with_request(ctx.method.as_str(), &ctx.url));
            }

            let next = match attempt.next() {
                Some(next) if !request.skip_auth => next,
                _ => {
                    warn!(
                        method = %ctx.method,
                        url = %ctx.url,
                        attempt = %attempt,
                        skip_auth = request.skip_auth,
                        "Unauthorized, not retrying"
                    );
                    return Err(self.unauthorized(problem, &ctx));
                }
            };

            info!(method = %ctx.method, url = %ctx.url, "401 received, resolving a fresh token");
            match self.tokens.resolve().await {
                Ok(fresh) if !fresh.as_str().is_empty() => {
                    debug!(method = %ctx.method, url = %ctx.url, "Fresh token obtained, retrying");
                    token = Some(fresh);
                    attempt = next;
                }
                Ok(_) => {
                    warn!(method = %ctx.method, url = %ctx.url, "Token provider returned an empty token");
                    return Err(self.unauthorized(problem, &ctx));
                }
                Err(e) => {
                    error!(method = %ctx.method, url = %ctx.url, error = %e, "Failed to get fresh token");
                    return Err(self.unauthorized(problem, &ctx));
                }
            }
        }
    }

    fn unauthorized(&self, problem: ProblemDetail, ctx: &RequestContext) -> HttpError {
        HttpError::unauthorized(problem).with_request(ctx.method.as_str(), &ctx.url)
    }

    /// Token for the initial attempt, if one should and can be attached.
    async fn authorize(&self, request: &ApiRequest, url: &str) -> Option<AccessToken> {
        if request.skip_auth {
            return None;
        }

        if !self.tokens.is_ready() {
            debug!(method = %request.method, url, "Auth not ready, proceeding without token");
            return None;
        }

        match self.tokens.resolve().await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(
                    method = %request.method,
                    url,
                    error = %e,
                    "Failed to get access token, proceeding without token"
                );
                None
            }
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        ctx: &RequestContext,
        token: Option<&AccessToken>,
    ) -> Dispatch {
        let mut builder = self.http_client.request(ctx.method.clone(), &ctx.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(token) = token.filter(|_| !ctx.skip_auth) {
            builder = builder.header(AUTHORIZATION, token.bearer());
        }

        debug!(
            method = %ctx.method,
            url = %ctx.url,
            attempt = %ctx.attempt,
            authorized = token.is_some() && !ctx.skip_auth,
            "API request"
        );

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    method = %ctx.method,
                    url = %ctx.url,
                    attempt = %ctx.attempt,
                    duration_ms = ctx.duration_ms(),
                    error = %e,
                    "API request failed without a response"
                );
                return Dispatch::NoResponse;
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => {
                error!(
                    method = %ctx.method,
                    url = %ctx.url,
                    status,
                    error = %e,
                    "Failed to read response body"
                );
                return Dispatch::NoResponse;
            }
        };

        if (200..300).contains(&status) {
            info!(
                method = %ctx.method,
                url = %ctx.url,
                status,
                duration_ms = ctx.duration_ms(),
                attempt = %ctx.attempt,
                "API response"
            );
            return Dispatch::Success(ApiResponse::new(status, headers, body));
        }

        let problem = ProblemDetail::from_body(&body);
        warn!(
            method = %ctx.method,
            url = %ctx.url,
            status,
            duration_ms = ctx.duration_ms(),
            attempt = %ctx.attempt,
            message_key = problem.message_key.as_deref().unwrap_or_default(),
            "API error response"
        );
        Dispatch::Failed { status, problem }
    }

    /// Send and decode a JSON body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let response = self.send(request).await?;
        response.json().map_err(ClientError::Decode)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.execute_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path)
            .json(body)
            .map_err(ClientError::Encode)?;
        self.execute_json(request).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::put(path)
            .json(body)
            .map_err(ClientError::Encode)?;
        self.execute_json(request).await
    }

    /// Send a DELETE, ignoring any response body.
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("tokens", &self.tokens)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
