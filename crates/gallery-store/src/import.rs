//! Streaming importer for legacy newline-delimited effect dumps.
//!
//! Each line holds one effect in the old document-store export shape:
//!
//! ```text
//! {"_id": 12, "created_at": {"$date": 1366033526000}, "modified_at": {...},
//!  "parent": 3, "parent_version": 0, "user": "4fe7", "hidden": false,
//!  "versions": [{"created_at": {"$date": ...}, "code": "..."}]}
//! ```
//!
//! Records are replayed through [`EffectRepository::restore_effect`] in file
//! order. The first bad line aborts the import.

use crate::queries::check_timestamp;
use crate::{Effect, EffectRepository, ParentRef, StoreError, StoreResult, Version};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};
use tracing::{debug, info};

/// Line buffer settings.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Longest accepted line, excluding the newline.
    pub max_line_bytes: usize,
    /// Read buffer capacity allocated up front.
    pub initial_buffer_bytes: usize,
}

impl ImportConfig {
    pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024 * 1024;
    pub const DEFAULT_INITIAL_BUFFER_BYTES: usize = 16 * 1024 * 1024;

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            initial_buffer_bytes: Self::DEFAULT_INITIAL_BUFFER_BYTES.min(max_line_bytes.max(1)),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: Self::DEFAULT_MAX_LINE_BYTES,
            initial_buffer_bytes: Self::DEFAULT_INITIAL_BUFFER_BYTES,
        }
    }
}

/// Outcome of a completed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Effects restored.
    pub imported: usize,
    /// Blank or too-short lines passed over.
    pub skipped: usize,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyDate {
    #[serde(rename = "$date")]
    millis: i64,
}

impl LegacyDate {
    fn to_utc(&self) -> StoreResult<DateTime<Utc>> {
        let dt = DateTime::from_timestamp_millis(self.millis).ok_or_else(|| {
            StoreError::InvalidData(format!("timestamp {} out of range", self.millis))
        })?;
        check_timestamp(&dt)?;
        Ok(dt)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyOwner {
    Name(String),
    Id(i64),
}

#[derive(Debug, Deserialize)]
struct LegacyVersion {
    #[serde(default)]
    created_at: LegacyDate,
    code: String,
}

#[derive(Debug, Deserialize)]
struct LegacyEffect {
    #[serde(rename = "_id", alias = "id")]
    id: i64,
    #[serde(default)]
    created_at: LegacyDate,
    #[serde(default)]
    modified_at: LegacyDate,
    #[serde(default)]
    parent: i64,
    #[serde(default)]
    parent_version: i64,
    #[serde(default, alias = "owner")]
    user: Option<LegacyOwner>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    versions: Vec<LegacyVersion>,
}

impl LegacyEffect {
    fn into_effect(self) -> StoreResult<Effect> {
        // Dumps mark roots with 0 or -1.
        let parent = (self.parent > 0).then_some(ParentRef {
            id: self.parent,
            version: self.parent_version,
        });
        let owner = match self.user {
            Some(LegacyOwner::Name(name)) => name,
            Some(LegacyOwner::Id(id)) => id.to_string(),
            None => String::new(),
        };
        let versions = self
            .versions
            .into_iter()
            .map(|v| {
                Ok(Version {
                    created_at: v.created_at.to_utc()?,
                    code: v.code,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Effect {
            id: self.id,
            created_at: self.created_at.to_utc()?,
            modified_at: self.modified_at.to_utc()?,
            parent,
            owner,
            hidden: self.hidden,
            versions,
        })
    }
}

/// Decode one dump line into an effect.
pub fn parse_line(line: &[u8]) -> StoreResult<Effect> {
    serde_json::from_slice::<LegacyEffect>(line)?.into_effect()
}

/// Replays a legacy dump into a repository.
#[derive(Debug, Clone, Default)]
pub struct Importer {
    config: ImportConfig,
}

impl Importer {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import every line of `reader` into `repo`.
    ///
    /// Errors carry the 1-based line number. Effects restored before the
    /// failing line stay in the repository.
    pub fn import<R: Read>(
        &self,
        reader: R,
        repo: &dyn EffectRepository,
    ) -> StoreResult<ImportReport> {
        let limit = self.config.max_line_bytes;
        let mut reader = BufReader::with_capacity(self.config.initial_buffer_bytes, reader);
        let mut buf = Vec::new();
        let mut report = ImportReport::default();
        let mut line = 0;

        loop {
            buf.clear();
            // Room for the limit plus a CRLF terminator; anything longer
            // still strips to more than `limit` bytes.
            let read = (&mut reader)
                .take((limit as u64).saturating_add(2))
                .read_until(b'\n', &mut buf)
                .map_err(|e| at_line(line + 1, e.into()))?;
            if read == 0 {
                break;
            }
            line += 1;

            let content = strip_newline(&buf);
            if content.len() > limit {
                return Err(at_line(line, StoreError::LineTooLong { limit }));
            }
            if content.trim_ascii().len() < 3 {
                report.skipped += 1;
                continue;
            }

            let effect = parse_line(content).map_err(|e| at_line(line, e))?;
            repo.restore_effect(&effect).map_err(|e| at_line(line, e))?;
            debug!(line, id = effect.id, versions = effect.versions.len(), "Restored effect");
            report.imported += 1;
        }

        info!(
            imported = report.imported,
            skipped = report.skipped,
            "Import finished"
        );
        Ok(report)
    }
}

fn strip_newline(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

fn at_line(line: usize, source: StoreError) -> StoreError {
    StoreError::Import {
        line,
        source: Box::new(source),
    }
}
