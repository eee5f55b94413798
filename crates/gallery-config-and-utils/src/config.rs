//! Configuration for the gallery tools.
//!
//! Resolution order: built-in defaults, then `<data>/config.json` when it
//! exists, then `GLSL_*` environment variables.

use crate::{parse_level, CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Default maximum number of pooled SQLite connections.
pub const DEFAULT_POOL_MAX_SIZE: u32 = 10;
/// Default SQLite busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Longest dump line the importer accepts by default (64 MiB).
const DEFAULT_IMPORT_MAX_LINE_BYTES: usize = 64 * 1024 * 1024;
/// Upper bound for `import_max_line_bytes` (1 GiB).
pub const MAX_IMPORT_LINE_BYTES: usize = 1024 * 1024 * 1024;

/// Gallery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Data directory. Always taken from [`Paths`], never from the file.
    #[serde(skip)]
    pub data_path: PathBuf,
    /// Longest line accepted by the dump importer.
    pub import_max_line_bytes: usize,
    /// Maximum pooled SQLite connections.
    pub pool_max_size: u32,
    /// How long a write waits on a locked database.
    pub busy_timeout_ms: u64,
    /// Refuse every write to the effect and user stores.
    pub read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            data_path: PathBuf::from(crate::DEFAULT_DATA_PATH),
            import_max_line_bytes: DEFAULT_IMPORT_MAX_LINE_BYTES,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            read_only: false,
        }
    }
}

impl Config {
    /// Load configuration for the data directory in `paths`.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };
        config.data_path = paths.base_dir().clone();

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `<data>/config.json`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        std::fs::create_dir_all(paths.base_dir())?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override fields from `GLSL_*` variables returned by `var`.
    ///
    /// `GLSL_DATA_PATH` is consumed by [`Paths::new`] instead.
    pub fn apply_env<F>(&mut self, var: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = lookup("GLSL_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(raw) = lookup("GLSL_IMPORT_MAX_LINE_BYTES") {
            self.import_max_line_bytes = parse_env("GLSL_IMPORT_MAX_LINE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("GLSL_POOL_MAX_SIZE") {
            self.pool_max_size = parse_env("GLSL_POOL_MAX_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("GLSL_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = parse_env("GLSL_BUSY_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("GLSL_READ_ONLY") {
            self.read_only = parse_bool("GLSL_READ_ONLY", &raw)?;
        }
        Ok(())
    }

    /// Reject values the store cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if parse_level(&self.log_level).is_none() {
            return Err(CoreError::Config(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        if self.import_max_line_bytes == 0 || self.import_max_line_bytes > MAX_IMPORT_LINE_BYTES {
            return Err(CoreError::Config(format!(
                "import_max_line_bytes must be between 1 and {MAX_IMPORT_LINE_BYTES}, got {}",
                self.import_max_line_bytes
            )));
        }
        if self.pool_max_size == 0 {
            return Err(CoreError::Config(
                "pool_max_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> CoreResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{name}: invalid value '{raw}'")))
}

fn parse_bool(name: &str, raw: &str) -> CoreResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::Config(format!("{name}: invalid value '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.import_max_line_bytes, 64 * 1024 * 1024);
        assert_eq!(config.pool_max_size, DEFAULT_POOL_MAX_SIZE);
        assert!(!config.read_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug",
            "read_only": true
        }"#;
        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.read_only);
        assert_eq!(config.pool_max_size, DEFAULT_POOL_MAX_SIZE);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("data"));

        let config = Config {
            log_level: "trace".to_string(),
            pool_max_size: 4,
            ..Config::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.pool_max_size, 4);
        assert_eq!(loaded.data_path, dir.path().join("data"));
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.import_max_line_bytes, 64 * 1024 * 1024);
        assert_eq!(config.data_path, dir.path());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("GLSL_LOG_LEVEL", "warn"),
                ("GLSL_IMPORT_MAX_LINE_BYTES", "1024"),
                ("GLSL_POOL_MAX_SIZE", "3"),
                ("GLSL_BUSY_TIMEOUT_MS", "750"),
                ("GLSL_READ_ONLY", "true"),
            ]))
            .unwrap();

        assert_eq!(config.log_level, "warn");
        assert_eq!(config.import_max_line_bytes, 1024);
        assert_eq!(config.pool_max_size, 3);
        assert_eq!(config.busy_timeout_ms, 750);
        assert!(config.read_only);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("GLSL_POOL_MAX_SIZE", "  ")]))
            .unwrap();
        assert_eq!(config.pool_max_size, DEFAULT_POOL_MAX_SIZE);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("GLSL_READ_ONLY", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("GLSL_READ_ONLY"));

        let err = config
            .apply_env(env(&[("GLSL_POOL_MAX_SIZE", "-1")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = Config {
            import_max_line_bytes: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_caps_import_line_limit() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("GLSL_IMPORT_MAX_LINE_BYTES", &usize::MAX.to_string())]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("import_max_line_bytes"));

        config.import_max_line_bytes = MAX_IMPORT_LINE_BYTES;
        assert!(config.validate().is_ok());
    }
}
