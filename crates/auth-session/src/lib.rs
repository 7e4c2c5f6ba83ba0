//! Authentication for the storefront client.
//!
//! This crate provides:
//! - `TokenProvider`, the registry the HTTP transport asks for bearer tokens
//! - `AuthSession`, the identity session with single-flight silent renewal
//! - Explicit FSM-based auth state management
//! - OpenID Connect sign-in (discovery, PKCE, code exchange, refresh)
//! - A loopback callback server for the browser redirect

mod auth_fsm;
mod error;
mod identity;
mod oauth;
mod oidc;
mod pkce;
mod session;
mod token_provider;

pub use auth_fsm::auth_machine;
pub use auth_fsm::{
    AuthMachine, AuthMachineInput, AuthMachineState, AuthState, AuthStateChangedPayload,
};
pub use error::{AuthError, AuthResult};
pub use identity::{profile_from_id_token, AuthorizationRequest, IdentityProvider, TokenSet};
pub use oauth::{
    AuthorizationCallback, OAuthCallbackServer, CALLBACK_PATH, DEFAULT_CALLBACK_TIMEOUT_SECS,
};
pub use oidc::{OidcClient, ProviderMetadata};
pub use pkce::{random_state, PkceChallenge};
pub use session::{AuthSession, AuthStateCallback, SignInRequest};
pub use token_provider::{AccessToken, TokenProvider, TokenResolver};
