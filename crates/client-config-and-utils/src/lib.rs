//! Configuration, paths, logging and shared error types for the storefront client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    normalize_base_url, Config, DEFAULT_API_BASE_URL, DEFAULT_CALLBACK_PORT, DEFAULT_LOCALE,
    DEFAULT_LOG_LEVEL, DEFAULT_OIDC_SCOPE, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
