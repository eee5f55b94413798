//! Pooled SQLite connections for the blocking backends.
//!
//! The schema is migrated once on a dedicated connection before the pool
//! hands anything out. Pooled connections then only get the per-connection
//! settings from [`configure_connection`], which the async executor shares.

use crate::{migrations, StoreError, StoreResult};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How long a writer waits on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for a [`StorePool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum open connections. Must be positive.
    pub max_size: u32,
    /// SQLite `busy_timeout` applied to every connection.
    pub busy_timeout: Duration,
    /// Open every pooled connection with `query_only`.
    pub read_only: bool,
    /// How long `get` waits for a free connection.
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    pub fn with_max_size(max_size: u32) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            read_only: false,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Apply the gallery's connection settings.
///
/// WAL lets page reads proceed while an append holds the write lock.
pub fn configure_connection(
    conn: &Connection,
    busy_timeout: Duration,
    read_only: bool,
) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )?;
    if read_only {
        conn.pragma_update(None, "query_only", true)?;
    }
    Ok(())
}

/// Shared connection pool behind [`crate::SqliteEffects`] and
/// [`crate::SqliteUsers`].
pub struct StorePool {
    pool: Pool<SqliteConnectionManager>,
    read_only: bool,
}

impl StorePool {
    /// Open the database at `path`, creating and migrating it as needed.
    pub fn open(path: &Path, config: PoolConfig) -> StoreResult<Self> {
        if config.max_size == 0 {
            return Err(StoreError::InvalidData(
                "pool max_size must be positive".to_string(),
            ));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        {
            let conn = Connection::open(path)?;
            configure_connection(&conn, config.busy_timeout, false)?;
            migrations::run_migrations(&conn)?;
        }

        let PoolConfig {
            busy_timeout,
            read_only,
            ..
        } = config;
        let manager = SqliteConnectionManager::file(path)
            .with_init(move |conn| configure_connection(conn, busy_timeout, read_only));

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(1))
            .connection_timeout(config.acquire_timeout)
            .build(manager)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(
            path = %path.display(),
            max_size = config.max_size,
            busy_timeout_ms = busy_timeout.as_millis() as u64,
            read_only,
            "Store pool opened"
        );
        Ok(Self { pool, read_only })
    }

    /// Borrow a connection, waiting up to the acquire timeout.
    pub fn get(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{queries, NewEffect};

    #[test]
    fn test_open_migrates_and_applies_busy_timeout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("gallery.db");
        let config = PoolConfig {
            busy_timeout: Duration::from_millis(250),
            ..PoolConfig::with_max_size(2)
        };

        let pool = StorePool::open(&db_path, config).unwrap();
        assert!(db_path.exists());
        assert!(!pool.is_read_only());

        let conn = pool.get().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 250);
    }

    #[test]
    fn test_read_only_pool_serves_reads_and_refuses_writes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("gallery.db");
        {
            let pool = StorePool::open(&db_path, PoolConfig::default()).unwrap();
            let mut conn = pool.get().unwrap();
            queries::create_effect(&mut conn, &NewEffect::root("ana", "v0")).unwrap();
        }

        let config = PoolConfig {
            read_only: true,
            ..PoolConfig::default()
        };
        let pool = StorePool::open(&db_path, config).unwrap();
        assert!(pool.is_read_only());

        let mut conn = pool.get().unwrap();
        assert_eq!(queries::count_effects(&conn, true).unwrap(), 1);
        assert!(queries::create_effect(&mut conn, &NewEffect::root("bo", "v0")).is_err());
        assert_eq!(queries::count_effects(&conn, true).unwrap(), 1);
    }

    #[test]
    fn test_zero_max_size_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = StorePool::open(&temp_dir.path().join("g.db"), PoolConfig::with_max_size(0));
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }
}
