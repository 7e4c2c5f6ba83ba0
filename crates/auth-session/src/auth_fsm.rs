//! Authentication state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐   SessionRestored
//! │   NotLoggedIn   │ ────────────────────────┐
//! └────────┬────────┘                         │
//!          │ SignInAttempt                    │
//!          ▼                                  │
//! ┌─────────────────┐  SignInFailed           │
//! │    SigningIn    │ ──────► NotLoggedIn     │
//! └────────┬────────┘                         │
//!          │ SignInSuccess                    │
//!          ▼                                  ▼
//! ┌─────────────────┐      TokenExpired      ┌─────────────────┐
//! │    SignedIn     │ ─────────────────────► │    Renewing     │
//! └────────┬────────┘ ◄───────────────────── └────────┬────────┘
//!          │              RenewalSuccess              │ RenewalFailed
//!          │ SignOutRequested                         ▼
//!          ▼                                     NotLoggedIn
//! ┌─────────────────┐
//! │   SigningOut    │
//! └────────┬────────┘
//!          │ SignOutComplete
//!          ▼
//!     NotLoggedIn
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(NotLoggedIn)

    NotLoggedIn => {
        SessionRestored => SignedIn,
        SignInAttempt => SigningIn
    },
    SigningIn => {
        SignInSuccess => SignedIn,
        SignInFailed => NotLoggedIn
    },
    SignedIn => {
        TokenExpired => Renewing,
        SignInAttempt => SigningIn,
        SignOutRequested => SigningOut
    },
    Renewing => {
        RenewalSuccess => SignedIn,
        RenewalFailed => NotLoggedIn,
        SignOutRequested => SigningOut
    },
    SigningOut => {
        SignOutComplete => NotLoggedIn
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Authentication state for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    NotLoggedIn,
    SigningIn,
    SignedIn,
    /// Silent renewal of an expired access token in progress.
    Renewing,
    SigningOut,
}

impl AuthState {
    /// Returns true while a session exists (including during renewal).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn | AuthState::Renewing)
    }

    /// Returns true if the state is a transient/in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthState::SigningIn | AuthState::Renewing | AuthState::SigningOut
        )
    }
}

impl From<&AuthMachineState> for AuthState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::NotLoggedIn => AuthState::NotLoggedIn,
            AuthMachineState::SigningIn => AuthState::SigningIn,
            AuthMachineState::SignedIn => AuthState::SignedIn,
            AuthMachineState::Renewing => AuthState::Renewing,
            AuthMachineState::SigningOut => AuthState::SigningOut,
        }
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AuthState::NotLoggedIn => "not logged in",
            AuthState::SigningIn => "signing in",
            AuthState::SignedIn => "signed in",
            AuthState::Renewing => "renewing",
            AuthState::SigningOut => "signing out",
        };
        f.write_str(label)
    }
}

/// Payload for auth state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    /// Current auth state.
    pub state: AuthState,
    /// Subject of the signed-in user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Set when the session was lost to a failed renewal and the user has
    /// to sign in again.
    #[serde(default)]
    pub reauthentication_required: bool,
}
