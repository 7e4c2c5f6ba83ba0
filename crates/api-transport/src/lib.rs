//! HTTP transport for the storefront REST backend.
//!
//! [`ApiClient`] attaches bearer tokens from the shared
//! [`auth_session::TokenProvider`], retries once after a 401 with a fresh
//! token, and turns every failure into an [`http_problem::HttpError`].

pub mod api;
mod client;
mod error;
mod request;
mod response;

#[cfg(test)]
mod tests;

pub use client::ApiClient;
pub use error::{as_http_error, error_message, is_http_error, ClientError, ClientResult};
pub use request::{ApiRequest, Attempt, RequestContext};
pub use response::ApiResponse;
