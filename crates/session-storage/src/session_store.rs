//! Persisted identity session.

use crate::{SecureStorage, StorageError, StorageKeys, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Claims describing the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Subject identifier from the identity provider
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserProfile {
    /// Best human-readable label for the user.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.preferred_username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}

/// Identity session as kept between runs.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// When the access token expires (RFC 3339)
    pub expires_at: String,
    pub profile: UserProfile,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"[redacted]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .field("profile", &self.profile)
            .finish()
    }
}

impl StoredSession {
    /// Parsed expiry, if well-formed.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether the access token is past its expiry.
    ///
    /// An unparsable expiry counts as expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }

    /// Seconds until expiry, negative once expired.
    pub fn expires_in_secs(&self) -> Option<i64> {
        self.expires_at()
            .map(|expires_at| expires_at.signed_duration_since(Utc::now()).num_seconds())
    }
}

/// Reads and writes the identity session for one authority/client pair.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SecureStorage>,
    key: String,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SecureStorage>, authority: &str, client_id: &str) -> Self {
        Self {
            storage,
            key: StorageKeys::session_key(authority, client_id),
        }
    }

    /// Storage key this store reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted session.
    ///
    /// An entry that no longer deserializes is deleted and reported as
    /// absent, so a format change never locks the user out.
    pub fn load(&self) -> StorageResult<Option<StoredSession>> {
        let Some(json) = self.storage.get(&self.key)? else {
            return Ok(None);
        };

        match serde_json::from_str::<StoredSession>(&json) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding unreadable session");
                self.storage.delete(&self.key)?;
                Ok(None)
            }
        }
    }

    /// Persist the session, replacing any previous one.
    pub fn save(&self, session: &StoredSession) -> StorageResult<()> {
        let json =
            serde_json::to_string(session).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(&self.key, &json)
    }

    /// Remove the session. Returns whether one existed.
    pub fn clear(&self) -> StorageResult<bool> {
        self.storage.delete(&self.key)
    }

    /// Check if a session is stored.
    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use chrono::Duration;

    fn session_expiring_in(delta: Duration) -> StoredSession {
        StoredSession {
            access_token: "access-token".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            id_token: None,
            token_type: "Bearer".to_string(),
            scope: Some("openid profile email".to_string()),
            expires_at: (Utc::now() + delta).to_rfc3339(),
            profile: UserProfile {
                sub: "user-123".to_string(),
                preferred_username: Some("lan".to_string()),
                email: Some("lan@shop.test".to_string()),
                name: None,
            },
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(
            Arc::new(MemoryStorage::new()),
            "https://id.shop.test/realms/shop",
            "storefront",
        )
    }

    #[test]
    fn test_session_store_roundtrip() {
        let store = store();
        assert!(store.load().unwrap().is_none());
        assert!(!store.has_session().unwrap());

        store.save(&session_expiring_in(Duration::hours(1))).unwrap();
        assert!(store.has_session().unwrap());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-token");
        assert_eq!(loaded.profile.sub, "user-123");

        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_session_store_uses_oidc_key() {
        let store = store();
        assert_eq!(
            store.key(),
            "oidc.user:https://id.shop.test/realms/shop:storefront"
        );
    }

    #[test]
    fn test_session_store_discards_corrupt_entry() {
        let storage: Arc<dyn SecureStorage> = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone(), "https://id", "web");
        storage.set(store.key(), "{\"access_token\": 42}").unwrap();

        assert!(store.load().unwrap().is_none());
        assert!(!storage.has(store.key()).unwrap());
    }

    #[test]
    fn test_session_expiry() {
        assert!(!session_expiring_in(Duration::hours(1)).is_expired());
        assert!(session_expiring_in(Duration::seconds(-1)).is_expired());

        let mut garbled = session_expiring_in(Duration::hours(1));
        garbled.expires_at = "tomorrow".to_string();
        assert!(garbled.is_expired());
        assert!(garbled.expires_in_secs().is_none());
    }

    #[test]
    fn test_session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session_expiring_in(Duration::hours(1)));
        assert!(!rendered.contains("access-token"));
        assert!(!rendered.contains("refresh-token"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut profile = UserProfile {
            sub: "sub-1".to_string(),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "sub-1");

        profile.email = Some("a@shop.test".to_string());
        assert_eq!(profile.display_name(), "a@shop.test");

        profile.preferred_username = Some("alice".to_string());
        assert_eq!(profile.display_name(), "alice");

        profile.name = Some("Alice".to_string());
        assert_eq!(profile.display_name(), "Alice");
    }
}
