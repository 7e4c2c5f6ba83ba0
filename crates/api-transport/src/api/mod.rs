//! Typed storefront endpoints.

mod chat;
mod types;
mod user;

pub use chat::{ChatApi, ChatProvider, ChatRequest, ChatResponse};
pub use types::{ApiListResponse, ApiSuccessResponse};
pub use user::{User, UserApi};
