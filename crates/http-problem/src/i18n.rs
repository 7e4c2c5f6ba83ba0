//! Locale-aware message catalog for user-facing error text.
//!
//! Keys are dotted paths (`http.error.404`). Messages may contain
//! `{{name}}` placeholders filled from a JSON params object.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Locales shipped with the client.
pub const SUPPORTED_LOCALES: &[&str] = &["en", "vi"];

/// Locale used when the active one lacks a key.
pub const DEFAULT_LOCALE: &str = "en";

/// Key of the generic fallback message.
pub const UNKNOWN_ERROR_KEY: &str = "http.error.unknown";

/// Last-resort text when even the catalog has no fallback message.
pub const UNKNOWN_ERROR_FALLBACK: &str = "Something went wrong, please try again";

const EN_MESSAGES: &[(&str, &str)] = &[
    ("http.error.network", "Unable to connect to the server"),
    ("http.error.unknown", UNKNOWN_ERROR_FALLBACK),
    ("http.error.400", "The request is invalid"),
    ("http.error.401", "Your session has expired, please sign in again"),
    ("http.error.403", "You do not have permission to perform this action"),
    ("http.error.404", "The requested resource was not found"),
    ("http.error.409", "The request conflicts with the current data"),
    ("http.error.422", "Some of the submitted data is invalid"),
    ("http.error.429", "Too many requests, please try again later"),
    ("http.error.500", "The server encountered an error, please try again later"),
    ("http.error.502", "Bad gateway, please try again later"),
    ("http.error.503", "The service is temporarily unavailable"),
    ("http.error.504", "The server took too long to respond"),
];

const VI_MESSAGES: &[(&str, &str)] = &[
    ("http.error.network", "Không thể kết nối tới máy chủ"),
    ("http.error.unknown", "Đã xảy ra lỗi, vui lòng thử lại"),
    ("http.error.400", "Yêu cầu không hợp lệ"),
    ("http.error.401", "Phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại"),
    ("http.error.403", "Bạn không có quyền thực hiện thao tác này"),
    ("http.error.404", "Không tìm thấy tài nguyên được yêu cầu"),
    ("http.error.409", "Yêu cầu xung đột với dữ liệu hiện tại"),
    ("http.error.422", "Một số dữ liệu gửi lên không hợp lệ"),
    ("http.error.429", "Quá nhiều yêu cầu, vui lòng thử lại sau"),
    ("http.error.500", "Máy chủ gặp lỗi, vui lòng thử lại sau"),
    ("http.error.502", "Lỗi cổng kết nối, vui lòng thử lại sau"),
    ("http.error.503", "Dịch vụ tạm thời không khả dụng"),
    ("http.error.504", "Máy chủ phản hồi quá lâu"),
];

/// Errors from configuring the catalog.
#[derive(Error, Debug)]
pub enum I18nError {
    #[error("Unsupported locale: {0}")]
    UnsupportedLocale(String),

    #[error("Invalid translation file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reduce a language tag to a supported locale (`vi-VN` -> `vi`).
pub fn normalize_locale(tag: &str) -> Option<&'static str> {
    let primary = tag
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    SUPPORTED_LOCALES.iter().copied().find(|l| *l == primary)
}

/// Translations for every supported locale plus the active locale.
pub struct MessageCatalog {
    messages: RwLock<HashMap<&'static str, HashMap<String, String>>>,
    active: RwLock<&'static str>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let mut messages = HashMap::new();
        messages.insert("en", to_map(EN_MESSAGES));
        messages.insert("vi", to_map(VI_MESSAGES));
        Self {
            messages: RwLock::new(messages),
            active: RwLock::new(DEFAULT_LOCALE),
        }
    }
}

fn to_map(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl MessageCatalog {
    /// Catalog with the built-in messages, English active.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the given locale active.
    pub fn with_locale(tag: &str) -> Result<Self, I18nError> {
        let catalog = Self::new();
        catalog.set_locale(tag)?;
        Ok(catalog)
    }

    /// Switch the active locale.
    pub fn set_locale(&self, tag: &str) -> Result<(), I18nError> {
        let locale =
            normalize_locale(tag).ok_or_else(|| I18nError::UnsupportedLocale(tag.to_string()))?;
        *self.active.write() = locale;
        debug!(locale, "Active locale changed");
        Ok(())
    }

    pub fn locale(&self) -> &'static str {
        *self.active.read()
    }

    /// Merge a nested JSON translation document into a locale.
    ///
    /// `{"http": {"error": {"404": "..."}}}` defines `http.error.404`.
    /// Returns the number of messages loaded.
    pub fn load_json(&self, tag: &str, json: &str) -> Result<usize, I18nError> {
        let locale =
            normalize_locale(tag).ok_or_else(|| I18nError::UnsupportedLocale(tag.to_string()))?;
        let document: Value = serde_json::from_str(json)?;

        let mut flat = Vec::new();
        flatten("", &document, &mut flat);
        let count = flat.len();

        self.messages
            .write()
            .entry(locale)
            .or_default()
            .extend(flat);
        debug!(locale, count, "Loaded translations");
        Ok(count)
    }

    /// Load `<locale>.json` files for every supported locale found in `dir`.
    pub fn load_dir(&self, dir: &Path) -> Result<usize, I18nError> {
        let mut total = 0;
        for locale in SUPPORTED_LOCALES {
            let path = dir.join(format!("{locale}.json"));
            if path.is_file() {
                let json = std::fs::read_to_string(&path)?;
                total += self.load_json(locale, &json)?;
            }
        }
        Ok(total)
    }

    /// Look a key up in the active locale, then the default locale.
    ///
    /// Returns `None` when neither has the key so callers can tell a miss
    /// from a translated message.
    pub fn translate(&self, key: &str, params: Option<&Map<String, Value>>) -> Option<String> {
        let active = self.locale();
        let messages = self.messages.read();
        let template = messages
            .get(active)
            .and_then(|m| m.get(key))
            .or_else(|| messages.get(DEFAULT_LOCALE).and_then(|m| m.get(key)))?;
        Some(interpolate(template, params))
    }

    /// Translate `key`, or return `default` on a miss.
    pub fn t(&self, key: &str, default: &str) -> String {
        self.translate(key, None)
            .unwrap_or_else(|| default.to_string())
    }

    /// Generic "something went wrong" message in the active locale.
    pub fn unknown_error(&self) -> String {
        self.t(UNKNOWN_ERROR_KEY, UNKNOWN_ERROR_FALLBACK)
    }
}

impl std::fmt::Debug for MessageCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCatalog")
            .field("locale", &self.locale())
            .finish_non_exhaustive()
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        Value::String(s) if !prefix.is_empty() => out.push((prefix.to_string(), s.clone())),
        _ => {}
    }
}

/// Replace `{{name}}` placeholders. A placeholder without a value becomes
/// an empty string.
fn interpolate(template: &str, params: Option<&Map<String, Value>>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);

        let name = rest[start + 2..start + 2 + len].trim();
        match params.and_then(|p| p.get(name)) {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Null) | None => {
                debug!(name, "Missing interpolation value");
            }
            Some(other) => out.push_str(&other.to_string()),
        }

        rest = &rest[start + 2 + len + 2..];
    }

    out.push_str(rest);
    out
}
