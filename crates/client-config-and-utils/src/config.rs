//! Configuration management for the storefront client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Local development backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8088";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default UI locale.
pub const DEFAULT_LOCALE: &str = "en";

/// Scopes requested at sign-in.
pub const DEFAULT_OIDC_SCOPE: &str = "openid profile email";

/// Loopback port for the sign-in redirect.
pub const DEFAULT_CALLBACK_PORT: u16 = 5173;

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// REST backend base URL, without trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Active UI locale (en, vi).
    #[serde(default = "default_locale")]
    pub locale: String,
    /// OpenID Connect issuer URL.
    #[serde(default)]
    pub oidc_authority: Option<String>,
    /// OpenID Connect client ID.
    #[serde(default)]
    pub oidc_client_id: Option<String>,
    /// Space-separated scopes requested at sign-in.
    #[serde(default = "default_oidc_scope")]
    pub oidc_scope: String,
    /// Loopback port receiving the sign-in redirect.
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_oidc_scope() -> String {
    DEFAULT_OIDC_SCOPE.to_string()
}

fn default_callback_port() -> u16 {
    DEFAULT_CALLBACK_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            locale: default_locale(),
            oidc_authority: None,
            oidc_client_id: None,
            oidc_scope: default_oidc_scope(),
            callback_port: DEFAULT_CALLBACK_PORT,
        }
    }
}

/// Strip a single trailing slash from a base URL.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from `config.json` (if present), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.api_base_url = normalize_base_url(&config.api_base_url);

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.api_base_url = normalize_base_url(&config.api_base_url);
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// Apply `STOREFRONT_*` overrides using the given variable lookup.
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(level) = get("STOREFRONT_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = get("STOREFRONT_API_BASE_URL") {
            self.api_base_url = normalize_base_url(&url);
        }
        if let Some(locale) = get("STOREFRONT_LOCALE") {
            self.locale = locale;
        }
        if let Some(authority) = get("STOREFRONT_OIDC_AUTHORITY") {
            self.oidc_authority = Some(authority);
        }
        if let Some(client_id) = get("STOREFRONT_OIDC_CLIENT_ID") {
            self.oidc_client_id = Some(client_id);
        }
        if let Some(timeout) = get("STOREFRONT_REQUEST_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %timeout, "ignoring invalid request timeout"),
            }
        }
    }

    /// The backend base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The OIDC authority and client ID, required for sign-in.
    pub fn oidc(&self) -> CoreResult<(&str, &str)> {
        match (self.oidc_authority.as_deref(), self.oidc_client_id.as_deref()) {
            (Some(authority), Some(client_id)) => Ok((authority, client_id)),
            _ => Err(CoreError::Config(
                "oidc_authority and oidc_client_id must be configured".to_string(),
            )),
        }
    }

    /// Loopback redirect URI registered with the identity provider.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/auth/callback", self.callback_port)
    }
}
