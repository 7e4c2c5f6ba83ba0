//! User profile endpoints.

use super::types::ApiSuccessResponse;
use crate::client::ApiClient;
use crate::error::ClientResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Storefront account as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub keycloak_id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub last_seen_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserApi {
    client: ApiClient,
}

impl UserApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn get_user_by_id(&self, id: &str) -> ClientResult<User> {
        debug!(user_id = id, "Fetching user");
        let path = format!("/user/{}", urlencoding::encode(id));
        let response: ApiSuccessResponse<User> = self.client.get_json(&path).await?;
        Ok(response.data)
    }

    /// The signed-in user's record, keyed by the identity provider subject.
    pub async fn get_current_user(&self, subject: &str) -> ClientResult<User> {
        self.get_user_by_id(subject).await
    }
}
