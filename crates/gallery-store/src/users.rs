//! SQLite-backed user repository consumed by the authentication layer.

use crate::pool::StorePool;
use crate::{queries, NewUser, StoreError, StoreResult, User};
use std::sync::Arc;

/// User accounts stored alongside effects.
#[derive(Clone)]
pub struct SqliteUsers {
    pool: Arc<StorePool>,
}

impl SqliteUsers {
    pub fn with_pool(pool: Arc<StorePool>) -> Self {
        Self { pool }
    }

    /// Insert a user after validation. Returns the new ID.
    pub fn add(&self, user: &NewUser) -> StoreResult<i64> {
        let conn = self.pool.get()?;
        queries::insert_user(&conn, user)
    }

    /// Get a user by ID.
    pub fn user(&self, id: i64) -> StoreResult<User> {
        let conn = self.pool.get()?;
        queries::get_user(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    /// Get a user by name.
    pub fn by_name(&self, name: &str) -> StoreResult<User> {
        let conn = self.pool.get()?;
        queries::get_user_by_name(&conn, name)?
            .ok_or_else(|| StoreError::NotFound(format!("user {name}")))
    }

    /// Get a user by external identity.
    pub fn by_provider(&self, provider: &str, provider_id: &str) -> StoreResult<User> {
        let conn = self.pool.get()?;
        queries::get_user_by_provider(&conn, provider, provider_id)?
            .ok_or_else(|| StoreError::NotFound(format!("user {provider}:{provider_id}")))
    }

    /// Overwrite a user row.
    pub fn update(&self, user: &User) -> StoreResult<()> {
        let conn = self.pool.get()?;
        if queries::update_user(&conn, user)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("user {}", user.id)))
        }
    }

    /// Apply `f` to the stored user and write the result back atomically.
    pub fn update_with<F>(&self, id: i64, f: F) -> StoreResult<User>
    where
        F: FnOnce(User) -> User,
    {
        let mut conn = self.pool.get()?;
        queries::update_user_with(&mut conn, id, f)
    }

    /// List all users.
    pub fn list(&self) -> StoreResult<Vec<User>> {
        let conn = self.pool.get()?;
        queries::list_users(&conn)
    }
}
