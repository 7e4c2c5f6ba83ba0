//! The single error shape surfaced for failed storefront calls.

use crate::i18n::MessageCatalog;
use crate::problem::ProblemDetail;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const NETWORK_ERROR_KEY: &str = "http.error.network";
pub const UNAUTHORIZED_KEY: &str = "http.error.401";
pub const NETWORK_ERROR_FALLBACK: &str = "Unable to connect to the server";

/// A normalized HTTP failure.
///
/// `status` is 0 when no response was received (connection refused, DNS,
/// timeout). The value is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    status: u16,
    detail: Option<String>,
    title: Option<String>,
    instance: Option<String>,
    message_key: Option<String>,
    params: Option<Map<String, Value>>,
    errors: Option<BTreeMap<String, Value>>,
    method: Option<String>,
    url: Option<String>,
}

/// Serialized diagnostic form of an [`HttpError`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpErrorReport<'a> {
    name: &'static str,
    message: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
}

impl HttpError {
    /// No response was received.
    pub fn network(catalog: &MessageCatalog) -> Self {
        Self {
            status: 0,
            detail: Some(catalog.t(NETWORK_ERROR_KEY, NETWORK_ERROR_FALLBACK)),
            title: None,
            instance: None,
            message_key: Some(NETWORK_ERROR_KEY.to_string()),
            params: None,
            errors: None,
            method: None,
            url: None,
        }
    }

    /// A non-2xx response. A zero `status` falls back to the body's.
    pub fn from_response(status: u16, problem: ProblemDetail) -> Self {
        let status = if status != 0 {
            status
        } else {
            problem.status.unwrap_or(0)
        };

        Self {
            status,
            detail: problem.detail.filter(|d| !d.is_empty()),
            title: problem.title,
            instance: problem.instance,
            message_key: problem.message_key.filter(|k| !k.is_empty()),
            params: problem.params,
            errors: problem.errors,
            method: None,
            url: None,
        }
    }

    /// A terminal 401. The message key defaults to `http.error.401`.
    pub fn unauthorized(problem: ProblemDetail) -> Self {
        let mut error = Self::from_response(401, problem);
        error
            .message_key
            .get_or_insert_with(|| UNAUTHORIZED_KEY.to_string());
        error
    }

    /// Attach the originating request for diagnostics.
    pub fn with_request(mut self, method: impl Into<String>, url: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.url = Some(url.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn message_key(&self) -> Option<&str> {
        self.message_key.as_deref()
    }

    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.params.as_ref()
    }

    /// Field-level validation messages.
    pub fn errors(&self) -> Option<&BTreeMap<String, Value>> {
        self.errors.as_ref()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }

    /// Errors the UI should treat as blocking: auth loss and server faults.
    pub fn is_hard(&self) -> bool {
        self.status == 401 || self.status >= 500
    }

    /// Worth retrying later without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status, 0 | 429 | 502 | 503 | 504)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Translation key describing this error.
    pub fn i18n_key(&self) -> String {
        match &self.message_key {
            Some(key) => key.clone(),
            None if self.status == 0 => NETWORK_ERROR_KEY.to_string(),
            None => format!("http.error.{}", self.status),
        }
    }

    /// Text to show the user. Never empty.
    ///
    /// Precedence: server `detail`, then the translated message key, then
    /// the generic fallback.
    pub fn user_message(&self, catalog: &MessageCatalog) -> String {
        if let Some(detail) = &self.detail {
            return detail.clone();
        }

        catalog
            .translate(&self.i18n_key(), self.params.as_ref())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| catalog.unknown_error())
    }

    pub fn report(&self) -> HttpErrorReport<'_> {
        HttpErrorReport {
            name: "HttpError",
            message: self.to_string(),
            status: self.status,
            details: self.detail.as_deref(),
            title: self.title.as_deref(),
            instance: self.instance.as_deref(),
            message_key: self.message_key.as_deref(),
            params: self.params.as_ref(),
            errors: self.errors.as_ref(),
            url: self.url.as_deref(),
            method: self.method.as_deref(),
        }
    }

    /// Diagnostic JSON for logs and bug reports.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.report()).unwrap_or(Value::Null)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.detail, &self.title) {
            (Some(detail), _) => f.write_str(detail),
            (None, Some(title)) => f.write_str(title),
            (None, None) => write!(f, "HTTP {}", self.status),
        }
    }
}

impl std::error::Error for HttpError {}
