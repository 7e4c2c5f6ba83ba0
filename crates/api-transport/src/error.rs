//! Error types for the API transport.

use http_problem::{HttpError, MessageCatalog};
use thiserror::Error;

/// Errors returned by the typed request helpers.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request failed at the HTTP level (no response or non-2xx)
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A 2xx body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The underlying HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Setup(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] client_config_and_utils::CoreError),
}

impl ClientError {
    pub fn as_http_error(&self) -> Option<&HttpError> {
        match self {
            ClientError::Http(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Find the [`HttpError`] behind an arbitrary error, if there is one.
pub fn as_http_error<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a HttpError> {
    error
        .downcast_ref::<HttpError>()
        .or_else(|| error.downcast_ref::<ClientError>()?.as_http_error())
}

pub fn is_http_error(error: &(dyn std::error::Error + 'static)) -> bool {
    as_http_error(error).is_some()
}

/// Message to show the user for any error. Never empty.
pub fn error_message(error: &(dyn std::error::Error + 'static), catalog: &MessageCatalog) -> String {
    if let Some(http) = as_http_error(error) {
        return http.user_message(catalog);
    }

    let text = error.to_string();
    if text.trim().is_empty() {
        catalog.unknown_error()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_problem::ProblemDetail;

    #[derive(Debug, Error)]
    #[error("")]
    struct Silent;

    #[test]
    fn test_is_http_error() {
        let http = HttpError::from_response(404, ProblemDetail::default());
        assert!(is_http_error(&http));
        assert!(is_http_error(&ClientError::Http(http)));

        let decode = ClientError::Decode(serde_json::from_str::<u8>("x").unwrap_err());
        assert!(!is_http_error(&decode));
        assert!(!is_http_error(&std::io::Error::other("disk")));
    }

    #[test]
    fn test_error_message() {
        let catalog = MessageCatalog::new();

        let http = ClientError::Http(HttpError::from_response(404, ProblemDetail::default()));
        assert_eq!(
            error_message(&http, &catalog),
            "The requested resource was not found"
        );

        let other = std::io::Error::other("disk full");
        assert_eq!(error_message(&other, &catalog), "disk full");

        assert_eq!(
            error_message(&Silent, &catalog),
            http_problem::UNKNOWN_ERROR_FALLBACK
        );
    }
}
