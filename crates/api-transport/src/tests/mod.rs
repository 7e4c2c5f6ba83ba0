//! Protocol tests for the transport against a mock backend.
//!
//! - `harness.rs`        - mock server, client and token resolvers
//! - `authorization.rs`  - when a bearer token is attached
//! - `retry.rs`          - one-shot refresh and retry on 401
//! - `errors.rs`         - network and HTTP error normalization
//! - `endpoints.rs`      - typed user and chat endpoints
//! - `renewal.rs`        - transport driven by a real `AuthSession`

mod endpoints;
mod errors;
pub(crate) mod harness;
mod retry;
