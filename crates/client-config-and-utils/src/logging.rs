//! Logging initialization for the storefront client.
//!
//! Wraps the observability crate so binaries only pick a level and an
//! optional JSONL file.

use observability::LogConfig;
use std::path::PathBuf;

/// Initialize the logging system.
///
/// - `RUST_LOG` overrides `level`
/// - `STOREFRONT_LOG_FILE` (or `log_file`) adds a JSONL sink
/// - compact output always goes to stderr
pub fn init_logging(level: &str, log_file: Option<PathBuf>) {
    let log_path = std::env::var("STOREFRONT_LOG_FILE")
        .ok()
        .and_then(non_empty_env)
        .map(PathBuf::from)
        .or(log_file);

    observability::init_with_config(LogConfig {
        service_name: "storefront".into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path,
        also_stderr: true,
    });
}

fn non_empty_env(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
