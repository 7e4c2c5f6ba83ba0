//! Public shopping assistant endpoint.

use crate::client::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::request::ApiRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    #[default]
    ChatGpt,
    Gemini,
}

impl ChatProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatProvider::ChatGpt => "chatgpt",
            ChatProvider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ChatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chatgpt" => Ok(ChatProvider::ChatGpt),
            "gemini" => Ok(ChatProvider::Gemini),
            other => Err(format!("unknown chat provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ChatProvider>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    pub provider: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct ChatApi {
    client: ApiClient,
}

impl ChatApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Ask the assistant a question. The endpoint is public, so no token is
    /// ever sent.
    pub async fn ask(
        &self,
        question: &str,
        provider: Option<ChatProvider>,
    ) -> ClientResult<ChatResponse> {
        let body = ChatRequest {
            question: question.trim().to_string(),
            provider,
        };
        let request = ApiRequest::post("/chat")
            .json(&body)
            .map_err(ClientError::Encode)?
            .skip_auth();
        self.client.execute_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChatProvider::ChatGpt).unwrap(),
            "\"chatgpt\""
        );
        assert_eq!("Gemini".parse::<ChatProvider>().unwrap(), ChatProvider::Gemini);
        assert!("bard".parse::<ChatProvider>().is_err());
    }

    #[test]
    fn test_request_omits_missing_provider() {
        let body = ChatRequest {
            question: "hi".to_string(),
            provider: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"question":"hi"}"#);
    }
}
