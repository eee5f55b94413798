//! # Observability
//!
//! Centralized logging layer for the gallery tools.
//!
//! Binaries call [`init_with_config`] once at startup and use standard
//! `tracing` macros everywhere else. Library crates never install a
//! subscriber.
//!
//! ## Dev mode
//!
//! With the `dev` feature every event is written as one JSON object per line
//! to the configured log file (by default
//! `<local data dir>/glslsandbox/logs/dev.jsonl`), which makes
//! `tail -f dev.jsonl | jq` usable while importing large dumps.
//! A compact human-readable copy can also go to stderr.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "gallery-admin".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! ```

#[cfg(feature = "dev")]
mod dev;

mod json_layer;

pub use json_layer::{JsonLayer, LogEntry};

use std::path::PathBuf;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every JSONL line.
    pub service_name: String,

    /// Default filter (e.g. "debug", "info,gallery_store=trace").
    /// Overridden by `RUST_LOG`.
    pub default_level: String,

    /// JSONL log file. Defaults to the per-user data directory.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,

    /// String fields longer than this are truncated in the JSONL output.
    /// Zero disables truncation.
    pub max_field_bytes: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            max_field_bytes: 0,
        }
    }
}

/// Initialize logging with default settings.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// Calling this more than once keeps the first subscriber.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    {
        dev::init_dev_subscriber(&config);
    }

    #[cfg(not(feature = "dev"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter(&config.default_level))
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .try_init();
    }
}

/// `RUST_LOG` when set and valid, otherwise `default_level`.
pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
