//! File system layout under the gallery data directory.

use std::path::PathBuf;

/// Data directory used when nothing else is configured.
pub const DEFAULT_DATA_PATH: &str = "./data";
/// Environment variable overriding the data directory.
pub const DATA_PATH_ENV: &str = "GLSL_DATA_PATH";

const DATABASE_NAME: &str = "glslsandbox.db";

/// Manages file system paths for the gallery.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Data directory holding the database, thumbnails and logs.
    base_dir: PathBuf,
}

impl Paths {
    /// Resolve the data directory from `GLSL_DATA_PATH`, falling back to `./data`.
    pub fn new() -> Self {
        let base_dir = std::env::var(DATA_PATH_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string());
        Self::with_base_dir(PathBuf::from(base_dir))
    }

    /// Create a new Paths instance with a custom data directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Optional JSON config (`<data>/config.json`).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// SQLite database holding effects and users (`<data>/glslsandbox.db`).
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join(DATABASE_NAME)
    }

    /// Rendered effect thumbnails, named by `Effect::image_name`.
    pub fn thumbs_dir(&self) -> PathBuf {
        self.base_dir.join("thumbs")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Structured JSONL log (`<data>/logs/dev.jsonl`).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("dev.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.thumbs_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
