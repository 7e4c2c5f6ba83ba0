//! Shared fixtures for the transport tests.

use crate::ApiClient;
use auth_session::{AccessToken, AuthError, TokenProvider};
use http_problem::MessageCatalog;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{MockServer, Request};

pub struct Harness {
    pub server: MockServer,
    pub tokens: Arc<TokenProvider>,
    pub client: ApiClient,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with_timeout(Duration::from_secs(5)).await
    }

    pub async fn start_with_timeout(timeout: Duration) -> Self {
        let server = MockServer::start().await;
        let tokens = Arc::new(TokenProvider::new());
        let client = ApiClient::new(
            &server.uri(),
            timeout,
            tokens.clone(),
            Arc::new(MessageCatalog::new()),
        )
        .unwrap();

        Self {
            server,
            tokens,
            client,
        }
    }

    /// Register a resolver returning `tokens[n]` on the n-th call (the last
    /// one repeats). Returns the call counter.
    pub fn register_sequence(&self, tokens: &[&str]) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        self.tokens.register_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let token = tokens[n.min(tokens.len() - 1)].clone();
            async move { Ok(AccessToken::new(token)) }
        });
        calls
    }

    /// Register a resolver that succeeds `ok_calls` times, then fails.
    pub fn register_failing_after(&self, ok_calls: usize) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        self.tokens.register_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < ok_calls {
                    Ok(AccessToken::new(format!("token-{n}")))
                } else {
                    Err(AuthError::RenewalFailed(Arc::new(AuthError::NoRefreshToken)))
                }
            }
        });
        calls
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

pub fn authorization(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Base URL of a port that refuses connections.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
