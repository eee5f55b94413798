//! Store error types.

use thiserror::Error;

/// Store error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool or executor error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// No effect (or user) with the requested id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Restore targeted an id that is already taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Record failed validation
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Import line exceeded the configured buffer limit
    #[error("Line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// Import aborted at a specific line
    #[error("Import failed at line {line}: {source}")]
    Import {
        line: usize,
        #[source]
        source: Box<StoreError>,
    },
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested entity does not exist.
    NotFound,
    /// Storage I/O, constraint or transaction failure.
    Storage,
    /// Input could not be parsed or violates the record shape.
    Validation,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidData(_) | Self::Json(_) | Self::LineTooLong { .. } => {
                ErrorKind::Validation
            }
            Self::Import { source, .. } => source.kind(),
            Self::Sqlite(_)
            | Self::Connection(_)
            | Self::Migration(_)
            | Self::AlreadyExists(_)
            | Self::Io(_) => ErrorKind::Storage,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn effect_not_found(id: i64) -> Self {
        Self::NotFound(format!("effect {id}"))
    }
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
