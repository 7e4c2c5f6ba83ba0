//! Process-wide registry for the active access token resolver.
//!
//! The transport never talks to the identity session directly. Whoever owns
//! the session registers a resolver here while a session exists and
//! unregisters it otherwise; the transport only asks for a token.

use crate::{AuthError, AuthResult};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Bearer access token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Asynchronous producer of a currently valid access token.
pub type TokenResolver =
    Arc<dyn Fn() -> BoxFuture<'static, AuthResult<AccessToken>> + Send + Sync>;

/// Holds at most one registered resolver.
#[derive(Default)]
pub struct TokenProvider {
    resolver: RwLock<Option<TokenResolver>>,
}

impl TokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the resolver, replacing any previous one.
    pub fn register(&self, resolver: TokenResolver) {
        let replaced = self.resolver.write().replace(resolver).is_some();
        debug!(replaced, "Access token resolver registered");
    }

    /// Register a plain async closure as the resolver.
    pub fn register_fn<F, Fut>(&self, resolver: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AuthResult<AccessToken>> + Send + 'static,
    {
        self.register(Arc::new(move || resolver().boxed()));
    }

    /// Clear the resolver. Calling this with nothing registered is a no-op.
    pub fn unregister(&self) {
        if self.resolver.write().take().is_some() {
            debug!("Access token resolver unregistered");
        }
    }

    /// Whether a resolver is registered.
    pub fn is_ready(&self) -> bool {
        self.resolver.read().is_some()
    }

    /// Ask the registered resolver for a token.
    ///
    /// Errors from the resolver are returned unchanged; nothing is retried
    /// or cached here.
    pub async fn resolve(&self) -> AuthResult<AccessToken> {
        let resolver = self
            .resolver
            .read()
            .clone()
            .ok_or(AuthError::ResolverNotRegistered)?;
        resolver().await
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_resolve_without_resolver_fails() {
        let provider = TokenProvider::new();
        assert!(!provider.is_ready());

        let result = provider.resolve().await;
        assert!(matches!(result, Err(AuthError::ResolverNotRegistered)));
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let provider = TokenProvider::new();
        provider.register_fn(|| async { Ok(AccessToken::new("t-1")) });

        assert!(provider.is_ready());
        assert_eq!(provider.resolve().await.unwrap().as_str(), "t-1");
    }

    #[tokio::test]
    async fn test_register_overwrites_previous() {
        let provider = TokenProvider::new();
        provider.register_fn(|| async { Ok(AccessToken::new("old")) });
        provider.register_fn(|| async { Ok(AccessToken::new("new")) });

        assert_eq!(provider.resolve().await.unwrap().as_str(), "new");
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let provider = TokenProvider::new();
        provider.register_fn(|| async { Ok(AccessToken::new("t")) });

        provider.unregister();
        provider.unregister();

        assert!(!provider.is_ready());
        assert!(matches!(
            provider.resolve().await,
            Err(AuthError::ResolverNotRegistered)
        ));
    }

    #[tokio::test]
    async fn test_resolver_errors_propagate_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = TokenProvider::new();
        let counter = calls.clone();
        provider.register_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(AuthError::NotLoggedIn) }
        });

        assert!(matches!(
            provider.resolve().await,
            Err(AuthError::NotLoggedIn)
        ));
        // No hidden retry
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolver_called_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = TokenProvider::new();
        let counter = calls.clone();
        provider.register_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(AccessToken::new(format!("t-{n}"))) }
        });

        assert_eq!(provider.resolve().await.unwrap().as_str(), "t-0");
        assert_eq!(provider.resolve().await.unwrap().as_str(), "t-1");
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret-value"));
        assert_eq!(token.bearer(), "Bearer secret-value");
    }
}
