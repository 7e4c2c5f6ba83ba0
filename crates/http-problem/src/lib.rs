//! Error normalization for the storefront HTTP client.
//!
//! Backend failures arrive as RFC 7807 problem details (or as nothing at
//! all). This crate turns them into one [`HttpError`] and resolves the
//! message a user should see through a [`MessageCatalog`].

mod http_error;
mod i18n;
mod problem;

pub use http_error::{
    HttpError, HttpErrorReport, NETWORK_ERROR_FALLBACK, NETWORK_ERROR_KEY, UNAUTHORIZED_KEY,
};
pub use i18n::{
    normalize_locale, I18nError, MessageCatalog, DEFAULT_LOCALE, SUPPORTED_LOCALES,
    UNKNOWN_ERROR_FALLBACK, UNKNOWN_ERROR_KEY,
};
pub use problem::ProblemDetail;
