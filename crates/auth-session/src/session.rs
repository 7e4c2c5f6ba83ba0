//! Identity session with silent renewal, using FSM-based state management.
//!
//! The persisted session (tokens and profile) lives in the `SessionStore`.
//! The FSM tracks transient states (signing in, renewing, signing out)
//! that are never persisted. While a session exists the `AuthSession`
//! registers a resolver into the shared `TokenProvider`.

use crate::auth_fsm::{AuthMachine, AuthMachineInput, AuthState, AuthStateChangedPayload};
use crate::identity::{profile_from_id_token, AuthorizationRequest, IdentityProvider, TokenSet};
use crate::oauth::AuthorizationCallback;
use crate::pkce::{random_state, PkceChallenge};
use crate::token_provider::{AccessToken, TokenProvider};
use crate::{AuthError, AuthResult};
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use session_storage::{SessionStore, StoredSession, UserProfile};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Callback type for auth state change notifications.
pub type AuthStateCallback = Box<dyn Fn(AuthStateChangedPayload) + Send + Sync>;

/// Stored form of the callback, cloned out before each call.
type SharedStateCallback = Arc<dyn Fn(AuthStateChangedPayload) + Send + Sync>;

/// In-flight renewal shared by every concurrent caller.
type RenewalFuture = Shared<BoxFuture<'static, Result<AccessToken, Arc<AuthError>>>>;

/// Pending authorization request, kept by the caller until the redirect
/// arrives.
#[derive(Clone)]
pub struct SignInRequest {
    /// URL to open in the browser.
    pub url: String,
    pub state: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("url", &self.url)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

struct Inner {
    store: SessionStore,
    provider: Arc<dyn IdentityProvider>,
    tokens: Arc<TokenProvider>,
    fsm: Mutex<AuthMachine>,
    renewal: Mutex<Option<RenewalFuture>>,
    state_callback: Mutex<Option<SharedStateCallback>>,
}

/// Shared identity session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<Inner>,
}

impl AuthSession {
    pub fn new(
        store: SessionStore,
        provider: Arc<dyn IdentityProvider>,
        tokens: Arc<TokenProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                provider,
                tokens,
                fsm: Mutex::new(AuthMachine::new()),
                renewal: Mutex::new(None),
                state_callback: Mutex::new(None),
            }),
        }
    }

    /// Set a callback to be notified of auth state changes.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        *self.inner.state_callback.lock() = Some(Arc::from(callback));
    }

    /// Get the current FSM state.
    pub fn state(&self) -> AuthState {
        AuthState::from(self.inner.fsm.lock().state())
    }

    /// The TokenProvider this session registers into.
    pub fn token_provider(&self) -> &Arc<TokenProvider> {
        &self.inner.tokens
    }

    /// Transition the FSM and notify callback if state changed.
    fn transition(&self, input: &AuthMachineInput) -> AuthResult<AuthState> {
        let mut fsm = self.inner.fsm.lock();
        let old_state = AuthState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = AuthState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(old_state = ?old_state, new_state = ?new_state, "Auth state transition");
            self.notify_state_change(new_state, false);
        }

        Ok(new_state)
    }

    /// Apply a transition that may legitimately not apply (e.g. sign-out
    /// while already signed out).
    fn try_transition(&self, input: &AuthMachineInput) {
        if let Err(e) = self.transition(input) {
            debug!(error = %e, "Ignoring auth transition");
        }
    }

    /// Force the FSM to `NotLoggedIn` regardless of the current state.
    fn reset_to_signed_out(&self, reauthentication_required: bool) {
        let mut fsm = self.inner.fsm.lock();
        let old_state = AuthState::from(fsm.state());
        *fsm = AuthMachine::new();
        drop(fsm);

        if old_state != AuthState::NotLoggedIn || reauthentication_required {
            self.notify_state_change(AuthState::NotLoggedIn, reauthentication_required);
        }
    }

    fn notify_state_change(&self, state: AuthState, reauthentication_required: bool) {
        // Cloned out so the callback may replace itself.
        let callback = self.inner.state_callback.lock().clone();
        if let Some(callback) = callback {
            let profile = self.inner.store.load().ok().flatten().map(|s| s.profile);
            callback(AuthStateChangedPayload {
                state,
                user_id: profile.as_ref().map(|p| p.sub.clone()),
                email: profile.and_then(|p| p.email),
                reauthentication_required,
            });
        }
    }

    /// Register this session's resolver. The resolver holds only a weak
    /// reference so the TokenProvider never keeps the session alive.
    fn register_resolver(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.tokens.register(Arc::new(move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => AuthSession { inner }.resolve_access_token().await,
                    None => Err(AuthError::NotLoggedIn),
                }
            }
            .boxed()
        }));
    }

    /// Load the persisted session on startup.
    ///
    /// Returns whether a session exists. An expired token is not renewed
    /// here; the first `resolve_access_token` call does that.
    pub fn restore(&self) -> AuthResult<bool> {
        match self.inner.store.load()? {
            Some(session) => {
                info!(
                    user_id = %session.profile.sub,
                    expired = session.is_expired(),
                    "Restored identity session"
                );
                self.try_transition(&AuthMachineInput::SessionRestored);
                self.register_resolver();
                Ok(true)
            }
            None => {
                debug!("No stored identity session");
                self.inner.tokens.unregister();
                Ok(false)
            }
        }
    }

    /// Profile of the signed-in user, if any.
    pub fn current_user(&self) -> AuthResult<Option<UserProfile>> {
        Ok(self.inner.store.load()?.map(|s| s.profile))
    }

    /// The persisted session, if any.
    pub fn current_session(&self) -> AuthResult<Option<StoredSession>> {
        Ok(self.inner.store.load()?)
    }

    /// Return a valid access token, renewing it silently if it expired.
    ///
    /// Concurrent callers during an expired-token window share a single
    /// renewal and all observe its outcome.
    pub async fn resolve_access_token(&self) -> AuthResult<AccessToken> {
        let session = self.inner.store.load()?.ok_or(AuthError::NotLoggedIn)?;
        if !session.is_expired() {
            return Ok(AccessToken::new(session.access_token));
        }

        debug!("Access token expired, joining renewal");
        self.renewal().await.map_err(AuthError::RenewalFailed)
    }

    /// Join the in-flight renewal or start one.
    fn renewal(&self) -> RenewalFuture {
        let mut slot = self.inner.renewal.lock();
        if let Some(in_flight) = slot.as_ref() {
            return in_flight.clone();
        }

        // A renewal may have finished between the caller's expiry check and
        // taking the slot.
        if let Ok(Some(session)) = self.inner.store.load() {
            if !session.is_expired() {
                let token = AccessToken::new(session.access_token);
                return futures_util::future::ready(Ok(token)).boxed().shared();
            }
        }

        let this = self.clone();
        let task = tokio::spawn(async move {
            let _slot = RenewalSlotGuard {
                session: this.clone(),
            };
            this.renew().await.map_err(Arc::new)
        });

        let owner = self.clone();
        let shared = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    if e.is_panic() {
                        warn!(error = %e, "Token renewal panicked, signing out");
                        owner.drop_session(true);
                    }
                    Err(Arc::new(AuthError::OAuth(format!(
                        "renewal task failed: {}",
                        e
                    ))))
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(shared.clone());
        shared
    }

    /// One renewal attempt. Runs on its own task.
    async fn renew(&self) -> AuthResult<AccessToken> {
        let current = self.inner.store.load()?.ok_or(AuthError::NotLoggedIn)?;
        self.try_transition(&AuthMachineInput::TokenExpired);

        let outcome = async {
            let refresh_token = current
                .refresh_token
                .as_deref()
                .ok_or(AuthError::NoRefreshToken)?;
            let tokens = self.inner.provider.refresh(refresh_token).await?;
            let profile = tokens
                .id_token
                .as_deref()
                .and_then(profile_from_id_token)
                .unwrap_or_else(|| current.profile.clone());
            let renewed = tokens.into_stored(profile, Some(&current));
            self.inner.store.save(&renewed)?;
            Ok::<_, AuthError>(renewed)
        }
        .await;

        match outcome {
            Ok(renewed) => {
                self.try_transition(&AuthMachineInput::RenewalSuccess);
                info!(
                    user_id = %renewed.profile.sub,
                    expires_at = %renewed.expires_at,
                    "Access token renewed"
                );
                Ok(AccessToken::new(renewed.access_token))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    requires_sign_in = e.requires_sign_in(),
                    "Token renewal failed, signing out"
                );
                self.drop_session(true);
                Err(e)
            }
        }
    }

    /// Clear local session state after it became unusable.
    fn drop_session(&self, reauthentication_required: bool) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
        self.inner.tokens.unregister();
        self.reset_to_signed_out(reauthentication_required);
    }

    /// Start an authorization code + PKCE sign-in.
    pub async fn begin_sign_in(&self, redirect_uri: &str) -> AuthResult<SignInRequest> {
        self.try_transition(&AuthMachineInput::SignInAttempt);

        let pkce = PkceChallenge::generate();
        let state = random_state();
        let request = AuthorizationRequest {
            redirect_uri: redirect_uri.to_string(),
            state: state.clone(),
            code_challenge: pkce.challenge.clone(),
        };

        match self.inner.provider.authorization_url(&request).await {
            Ok(url) => Ok(SignInRequest {
                url,
                state,
                code_verifier: pkce.verifier,
                redirect_uri: redirect_uri.to_string(),
            }),
            Err(e) => {
                self.try_transition(&AuthMachineInput::SignInFailed);
                Err(e)
            }
        }
    }

    /// Finish sign-in with the parameters delivered to the redirect URI.
    pub async fn complete_sign_in(
        &self,
        request: &SignInRequest,
        callback: AuthorizationCallback,
    ) -> AuthResult<UserProfile> {
        self.try_transition(&AuthMachineInput::SignInAttempt);

        let outcome = async {
            if let Some(error) = callback.error {
                let message = match callback.error_description {
                    Some(description) => format!("{}: {}", error, description),
                    None => error,
                };
                return Err(AuthError::OAuth(message));
            }
            if callback.state.as_deref() != Some(request.state.as_str()) {
                return Err(AuthError::StateMismatch);
            }
            let code = callback
                .code
                .ok_or_else(|| AuthError::OAuth("missing authorization code".to_string()))?;

            self.inner
                .provider
                .exchange_code(&code, &request.code_verifier, &request.redirect_uri)
                .await
        }
        .await;

        match outcome {
            Ok(tokens) => self.finish_sign_in(tokens).await,
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                self.try_transition(&AuthMachineInput::SignInFailed);
                Err(e)
            }
        }
    }

    /// Adopt a token set obtained elsewhere.
    pub async fn sign_in_with_tokens(&self, tokens: TokenSet) -> AuthResult<UserProfile> {
        self.try_transition(&AuthMachineInput::SignInAttempt);
        self.finish_sign_in(tokens).await
    }

    async fn finish_sign_in(&self, tokens: TokenSet) -> AuthResult<UserProfile> {
        let outcome = async {
            let profile = match tokens.id_token.as_deref().and_then(profile_from_id_token) {
                Some(profile) => profile,
                None => self.inner.provider.user_info(&tokens.access_token).await?,
            };
            let session = tokens.into_stored(profile, None);
            self.inner.store.save(&session)?;
            Ok::<_, AuthError>(session.profile)
        }
        .await;

        match outcome {
            Ok(profile) => {
                self.try_transition(&AuthMachineInput::SignInSuccess);
                self.register_resolver();
                info!(user_id = %profile.sub, "Signed in");
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                self.try_transition(&AuthMachineInput::SignInFailed);
                Err(e)
            }
        }
    }

    /// Sign out locally and return the provider's end-session URL, if any.
    pub async fn sign_out(
        &self,
        post_logout_redirect_uri: Option<&str>,
    ) -> AuthResult<Option<String>> {
        self.try_transition(&AuthMachineInput::SignOutRequested);

        let id_token = self.inner.store.load()?.and_then(|s| s.id_token);
        self.inner.store.clear()?;
        self.inner.tokens.unregister();

        self.try_transition(&AuthMachineInput::SignOutComplete);
        if self.state() != AuthState::NotLoggedIn {
            self.reset_to_signed_out(false);
        }
        info!("Signed out");

        match self
            .inner
            .provider
            .end_session_url(id_token.as_deref(), post_logout_redirect_uri)
            .await
        {
            Ok(url) => Ok(url),
            Err(e) => {
                warn!(error = %e, "Could not build end-session URL");
                Ok(None)
            }
        }
    }
}

/// Releases the renewal slot when the renewal task's future is dropped,
/// whether it completed, panicked or was cancelled.
struct RenewalSlotGuard {
    session: AuthSession,
}

impl Drop for RenewalSlotGuard {
    fn drop(&mut self) {
        self.session.inner.renewal.lock().take();
    }
}
