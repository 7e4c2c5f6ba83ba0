//! Logging setup shared by the storefront binaries.
//!
//! Library crates only emit `tracing` events. The binary calls
//! [`init_with_config`] once; events then go to a compact stderr layer
//! and, when `log_path` is set, to a JSONL file (see [`LogEntry`]).

mod json_layer;
mod jsonl;

use std::path::PathBuf;

pub use json_layer::{JsonLayer, LogEntry};
pub use jsonl::{CentralLogWriter, WriterFactory};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Written as `service` on every JSONL line.
    pub service_name: String,
    /// Level filter used when `RUST_LOG` is unset.
    pub default_level: String,
    /// JSONL file; `None` disables the file sink.
    pub log_path: Option<PathBuf>,
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// Installing a global subscriber twice is a no-op: the second call logs a
/// debug line and returns.
pub fn init_with_config(config: LogConfig) {
    jsonl::init_subscriber(&config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.also_stderr);
    }
}
