//! Storage key helpers.

/// Storage keys used by the storefront client
pub struct StorageKeys;

impl StorageKeys {
    /// Prefix shared by every persisted identity session.
    pub const SESSION_PREFIX: &'static str = "oidc.user:";

    /// Key of the identity session for one authority/client pair.
    ///
    /// Format: `oidc.user:<authority>:<client_id>`
    pub fn session_key(authority: &str, client_id: &str) -> String {
        format!("{}{}:{}", Self::SESSION_PREFIX, authority, client_id)
    }
}
