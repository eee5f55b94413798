//! Dev-mode logging configuration.
//!
//! Writes structured JSONL logs to a file that can be tailed by external
//! tools. Several processes may append to the same file.

use crate::json_layer::JsonLayer;
use crate::{env_filter, LogConfig};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// `<local data dir>/glslsandbox/logs/dev.jsonl`, or `./logs/dev.jsonl`
/// when the platform has no data directory.
fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("glslsandbox"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logs")
        .join("dev.jsonl")
}

/// Append-mode file writer shared by every event.
#[derive(Clone)]
pub struct CentralLogWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl CentralLogWriter {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for CentralLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        // Lines must reach the file before another process appends.
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// MakeWriter implementation for tracing-subscriber
#[derive(Clone)]
pub struct WriterFactory {
    writer: CentralLogWriter,
}

impl<'a> MakeWriter<'a> for WriterFactory {
    type Writer = CentralLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer.clone()
    }
}

/// Install the JSONL file layer plus the optional stderr layer.
///
/// When the log file cannot be opened, logging continues on stderr only.
pub fn init_dev_subscriber(config: &LogConfig) {
    let log_path = config.log_path.clone().unwrap_or_else(default_log_path);

    let (json_layer, open_error) = match CentralLogWriter::new(&log_path) {
        Ok(writer) => {
            let layer = JsonLayer::new(config.service_name.clone(), WriterFactory { writer })
                .with_max_field_bytes(config.max_field_bytes);
            (Some(layer.with_filter(env_filter(&config.default_level))), None)
        }
        Err(e) => (None, Some(e)),
    };

    let stderr_layer = (config.also_stderr || open_error.is_some()).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();
    if !installed {
        return;
    }

    match open_error {
        None => tracing::debug!(log_path = %log_path.display(), "observability initialized"),
        Some(e) => tracing::warn!(
            log_path = %log_path.display(),
            error = %e,
            "log file unavailable, logging to stderr only"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn test_central_log_writer_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("test.jsonl");

        let mut writer = CentralLogWriter::new(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        writer.clone().write_all(b"second\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_writer_appends_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deeply").join("nested").join("test.jsonl");

        CentralLogWriter::new(&path)
            .unwrap()
            .write_all(b"one\n")
            .unwrap();
        CentralLogWriter::new(&path)
            .unwrap()
            .write_all(b"two\n")
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_default_log_path_ends_in_jsonl() {
        let path = default_log_path();
        assert!(path.ends_with("logs/dev.jsonl"));
    }
}
