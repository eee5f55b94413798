//! Async effect store using a dedicated background thread.
//!
//! All SQLite work for one [`AsyncEffects`] runs on a single thread owned by
//! `tokio_rusqlite`. Callers await results without blocking the runtime and
//! requests execute in FIFO order.
//!
//! Only SQL and row mapping belong inside [`AsyncEffects::call`]. Rendering,
//! file I/O and network calls must happen outside, otherwise they stall every
//! queued query.
//!
//! ```ignore
//! let store = AsyncEffects::open(path).await?;
//! let id = store.create_effect(NewEffect::root("ana", code)).await?;
//! let page = store.page(0, 20, false).await?;
//! ```

use crate::pool::{self, DEFAULT_BUSY_TIMEOUT};
use crate::{migrations, queries, Effect, NewEffect, StoreError, StoreResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> StoreError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => StoreError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => StoreError::Connection("connection closed".to_string()),
        other => StoreError::Connection(other.to_string()),
    }
}

/// Effect store for async request handlers.
///
/// Clones share the executor thread.
#[derive(Clone)]
pub struct AsyncEffects {
    conn: Connection,
    path: String,
}

impl AsyncEffects {
    /// Open (and migrate) the database at `path`.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();
        info!(path = %path_str, "Opening async effect store");

        let conn = Connection::open(path_str.clone())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self {
            conn,
            path: path_str,
        };

        store
            .call(|conn| {
                pool::configure_connection(conn, DEFAULT_BUSY_TIMEOUT, false)?;
                migrations::run_migrations(conn)
            })
            .await?;

        info!(path = %store.path, "Async effect store initialized with WAL mode");
        Ok(store)
    }

    /// Run `f` on the executor thread.
    pub async fn call<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut rusqlite::Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // Our result rides inside the Ok variant so StoreError survives the hop.
        match self.conn.call(move |conn| Ok(f(conn))).await {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    pub async fn create_effect(&self, effect: NewEffect) -> StoreResult<i64> {
        self.call(move |conn| queries::create_effect(conn, &effect)).await
    }

    pub async fn append_version(&self, id: i64, code: impl Into<String>) -> StoreResult<i64> {
        let code = code.into();
        self.call(move |conn| queries::append_version(conn, id, &code)).await
    }

    pub async fn restore_effect(&self, effect: Effect) -> StoreResult<()> {
        self.call(move |conn| queries::restore_effect(conn, &effect)).await
    }

    pub async fn get_effect(&self, id: i64) -> StoreResult<Effect> {
        self.call(move |conn| queries::with_snapshot(conn, |tx| queries::get_effect(tx, id)))
            .await?
            .ok_or_else(|| StoreError::effect_not_found(id))
    }

    pub async fn page(
        &self,
        number: usize,
        size: usize,
        include_hidden: bool,
    ) -> StoreResult<Vec<Effect>> {
        self.call(move |conn| {
            queries::with_snapshot(conn, |tx| {
                queries::page_effects(tx, number, size, include_hidden)
            })
        })
        .await
    }

    pub async fn page_siblings(
        &self,
        number: usize,
        size: usize,
        parent_id: i64,
    ) -> StoreResult<Vec<Effect>> {
        self.call(move |conn| {
            queries::with_snapshot(conn, |tx| queries::page_siblings(tx, number, size, parent_id))
        })
        .await
    }

    pub async fn set_hidden(&self, id: i64, hidden: bool) -> StoreResult<()> {
        if self
            .call(move |conn| queries::set_hidden(conn, id, hidden))
            .await?
        {
            Ok(())
        } else {
            Err(StoreError::effect_not_found(id))
        }
    }

    pub async fn count(&self, include_hidden: bool) -> StoreResult<u64> {
        self.call(move |conn| queries::count_effects(conn, include_hidden)).await
    }

    pub async fn count_siblings(&self, parent_id: i64) -> StoreResult<u64> {
        self.call(move |conn| queries::count_siblings(conn, parent_id)).await
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        self.call(|conn| Ok(conn.execute_batch("SELECT 1")?)).await?;
        debug!("Async store health check passed");
        Ok(())
    }

    /// Wait for queued work, then stop the executor thread.
    pub async fn close(self) -> StoreResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| StoreError::Connection(format!("failed to close store: {e:?}")))?;
        info!(path = %self.path, "Async effect store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParentRef;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_and_health_check() {
        let dir = tempdir().unwrap();
        let store = AsyncEffects::open(&dir.path().join("async.db")).await.unwrap();
        assert!(store.health_check().await.is_ok());
        assert_eq!(store.count(true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_append_and_fork() {
        let dir = tempdir().unwrap();
        let store = AsyncEffects::open(&dir.path().join("async.db")).await.unwrap();

        let root = store.create_effect(NewEffect::root("ana", "a")).await.unwrap();
        assert_eq!(store.append_version(root, "b").await.unwrap(), 1);

        let fork = store
            .create_effect(NewEffect::fork(root, 1, "ben", "c"))
            .await
            .unwrap();
        let forked = store.get_effect(fork).await.unwrap();
        assert_eq!(forked.parent, Some(ParentRef { id: root, version: 1 }));

        let siblings = store.page_siblings(0, 10, root).await.unwrap();
        let mut ids: Vec<i64> = siblings.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![root, fork]);
    }

    #[tokio::test]
    async fn test_missing_effect_is_not_found() {
        let dir = tempdir().unwrap();
        let store = AsyncEffects::open(&dir.path().join("async.db")).await.unwrap();

        assert!(store.get_effect(7).await.unwrap_err().is_not_found());
        assert!(store.append_version(7, "x").await.unwrap_err().is_not_found());
        assert!(store.set_hidden(7, true).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_appends() {
        let dir = tempdir().unwrap();
        let store = AsyncEffects::open(&dir.path().join("async.db")).await.unwrap();
        let id = store.create_effect(NewEffect::root("ana", "v0")).await.unwrap();

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append_version(id, format!("v{}", i + 1)).await
            }));
        }

        let mut numbers = vec![];
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap());
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
        assert_eq!(store.get_effect(id).await.unwrap().versions.len(), 11);
    }

    #[tokio::test]
    async fn test_hidden_excluded_from_public_page() {
        let dir = tempdir().unwrap();
        let store = AsyncEffects::open(&dir.path().join("async.db")).await.unwrap();
        let a = store.create_effect(NewEffect::root("ana", "a")).await.unwrap();
        let b = store.create_effect(NewEffect::root("ana", "b")).await.unwrap();
        store.set_hidden(a, true).await.unwrap();

        let public: Vec<i64> = store
            .page(0, 10, false)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(public, vec![b]);
        assert_eq!(store.count(true).await.unwrap(), 2);
        assert_eq!(store.count(false).await.unwrap(), 1);

        store.close().await.unwrap();
    }
}
