use serde::{Deserialize, Serialize};

/// Envelope wrapping every successful backend payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSuccessResponse<T> {
    pub data: T,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub timestamp: String,
}

pub type ApiListResponse<T> = ApiSuccessResponse<Vec<T>>;
