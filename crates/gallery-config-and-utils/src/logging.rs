//! Logging initialization for the gallery tools.
//!
//! Thin wrapper over the observability crate: structured JSONL goes to
//! `<data>/logs/dev.jsonl` and a compact copy goes to stderr.

use crate::Paths;
use observability::LogConfig;

/// Shader code can be megabytes long; log fields are cut to this size.
const MAX_FIELD_BYTES: usize = 4096;

/// Initialize the logging system for `service`.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// ```ignore
/// init_logging("gallery-admin", &config.log_level, &paths);
/// tracing::info!("ready");
/// ```
pub fn init_logging(service: &str, level: &str, paths: &Paths) {
    observability::init_with_config(LogConfig {
        service_name: service.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
        max_field_bytes: MAX_FIELD_BYTES,
        ..Default::default()
    });
}

/// Parse a log level string into a tracing Level.
///
/// Returns None for anything `EnvFilter` would not accept as a bare level.
pub fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(tracing::Level::TRACE),
        "debug" => Some(tracing::Level::DEBUG),
        "info" => Some(tracing::Level::INFO),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "error" => Some(tracing::Level::ERROR),
        _ => None,
    }
}
