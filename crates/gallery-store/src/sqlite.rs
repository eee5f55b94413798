//! SQLite-backed effect repository over the connection pool.

use crate::pool::{PoolConfig, StorePool};
use crate::{queries, Effect, EffectRepository, NewEffect, StoreError, StoreResult};
use std::path::Path;
use std::sync::Arc;

/// Effect repository persisted in SQLite.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Clone)]
pub struct SqliteEffects {
    pool: Arc<StorePool>,
}

impl SqliteEffects {
    /// Open (and migrate) the database at `path`.
    pub fn open(path: &Path, config: PoolConfig) -> StoreResult<Self> {
        Ok(Self::with_pool(Arc::new(StorePool::open(path, config)?)))
    }

    /// Build on an existing pool, e.g. one shared with [`crate::SqliteUsers`].
    pub fn with_pool(pool: Arc<StorePool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<StorePool> {
        &self.pool
    }
}

impl EffectRepository for SqliteEffects {
    fn create_effect(&self, effect: NewEffect) -> StoreResult<i64> {
        let mut conn = self.pool.get()?;
        queries::create_effect(&mut conn, &effect)
    }

    fn append_version(&self, id: i64, code: &str) -> StoreResult<i64> {
        let mut conn = self.pool.get()?;
        queries::append_version(&mut conn, id, code)
    }

    fn restore_effect(&self, effect: &Effect) -> StoreResult<()> {
        let mut conn = self.pool.get()?;
        queries::restore_effect(&mut conn, effect)
    }

    fn get_effect(&self, id: i64) -> StoreResult<Effect> {
        let mut conn = self.pool.get()?;
        queries::with_snapshot(&mut conn, |tx| queries::get_effect(tx, id))?
            .ok_or_else(|| StoreError::effect_not_found(id))
    }

    fn page(&self, number: usize, size: usize, include_hidden: bool) -> StoreResult<Vec<Effect>> {
        let mut conn = self.pool.get()?;
        queries::with_snapshot(&mut conn, |tx| {
            queries::page_effects(tx, number, size, include_hidden)
        })
    }

    fn page_siblings(
        &self,
        number: usize,
        size: usize,
        parent_id: i64,
    ) -> StoreResult<Vec<Effect>> {
        let mut conn = self.pool.get()?;
        queries::with_snapshot(&mut conn, |tx| {
            queries::page_siblings(tx, number, size, parent_id)
        })
    }

    fn set_hidden(&self, id: i64, hidden: bool) -> StoreResult<()> {
        let conn = self.pool.get()?;
        if queries::set_hidden(&conn, id, hidden)? {
            Ok(())
        } else {
            Err(StoreError::effect_not_found(id))
        }
    }

    fn count(&self, include_hidden: bool) -> StoreResult<u64> {
        let conn = self.pool.get()?;
        queries::count_effects(&conn, include_hidden)
    }

    fn count_siblings(&self, parent_id: i64) -> StoreResult<u64> {
        let conn = self.pool.get()?;
        queries::count_siblings(&conn, parent_id)
    }
}
