//! Standalone query functions that work with any Connection.
//!
//! These functions are shared by the pooled store and the async executor.
//! Multi-statement writes take `&mut Connection` and run inside
//! [`with_transaction`]; single statements take `&Connection`.

use crate::{
    Effect, NewEffect, NewUser, ParentRef, Role, StoreError, StoreResult, User, Version,
};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{
    params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// Transactions
// ==========================================

/// Run `f` inside an IMMEDIATE transaction.
///
/// The write lock is taken at BEGIN, so two appends to the same effect
/// cannot both read the same max version. The transaction rolls back when
/// dropped, which covers early returns and panics inside `f`.
pub fn with_transaction<T, F>(conn: &mut Connection, f: F) -> StoreResult<T>
where
    F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Run read-only `f` against a single snapshot.
pub fn with_snapshot<T, F>(conn: &mut Connection, f: F) -> StoreResult<T>
where
    F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
    let value = f(&tx)?;
    tx.finish()?;
    Ok(value)
}

// ==========================================
// Effects
// ==========================================

const EFFECT_COLUMNS: &str = "id, created_at, modified_at, parent, parent_version, owner, hidden";

/// Create an effect with its initial version.
pub fn create_effect(conn: &mut Connection, effect: &NewEffect) -> StoreResult<i64> {
    let now = Utc::now();
    let id = with_transaction(conn, |tx| {
        let stamp = format_datetime(&now);
        tx.execute(
            "INSERT INTO effects (created_at, modified_at, parent, parent_version, owner, hidden)
             VALUES (?1, ?1, ?2, ?3, ?4, 0)",
            params![
                stamp,
                effect.parent.map(|p| p.id),
                effect.parent.map(|p| p.version),
                effect.owner,
            ],
        )?;
        let id = tx.last_insert_rowid();
        insert_version(tx, id, 0, &now, &effect.code)?;
        Ok(id)
    })?;
    debug!(effect_id = id, "Effect created");
    Ok(id)
}

/// Append a version to an existing effect, returning the new version number.
pub fn append_version(conn: &mut Connection, id: i64, code: &str) -> StoreResult<i64> {
    let version = with_transaction(conn, |tx| {
        let max: Option<i64> = tx.query_row(
            "SELECT MAX(version) FROM versions WHERE effect = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let next = match max {
            Some(max) => max + 1,
            None => return Err(StoreError::effect_not_found(id)),
        };

        let now = Utc::now();
        insert_version(tx, id, next, &now, code)?;
        tx.execute(
            "UPDATE effects SET modified_at = ?1 WHERE id = ?2",
            params![format_datetime(&now), id],
        )?;
        Ok(next)
    })?;
    debug!(effect_id = id, version, "Version appended");
    Ok(version)
}

/// Insert an effect verbatim, keeping its id and version history.
pub fn restore_effect(conn: &mut Connection, effect: &Effect) -> StoreResult<()> {
    validate_restore(effect)?;
    with_transaction(conn, |tx| {
        let inserted = tx.execute(
            "INSERT INTO effects (id, created_at, modified_at, parent, parent_version, owner, hidden)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                effect.id,
                format_datetime(&effect.created_at),
                format_datetime(&effect.modified_at),
                effect.parent.map(|p| p.id),
                effect.parent.map(|p| p.version),
                effect.owner,
                effect.hidden,
            ],
        );
        if let Err(e) = inserted {
            return Err(map_constraint(e, || format!("effect {}", effect.id)));
        }

        for (number, version) in effect.versions.iter().enumerate() {
            insert_version(tx, effect.id, number as i64, &version.created_at, &version.code)?;
        }
        Ok(())
    })?;
    debug!(
        effect_id = effect.id,
        versions = effect.versions.len(),
        "Effect restored"
    );
    Ok(())
}

/// Reject records that would break the ledger invariants.
pub(crate) fn validate_restore(effect: &Effect) -> StoreResult<()> {
    if effect.id <= 0 {
        return Err(StoreError::InvalidData(format!(
            "effect id must be positive, got {}",
            effect.id
        )));
    }
    if effect.versions.is_empty() {
        return Err(StoreError::InvalidData(format!(
            "effect {} has no versions",
            effect.id
        )));
    }
    check_timestamp(&effect.created_at)?;
    check_timestamp(&effect.modified_at)?;
    for version in &effect.versions {
        check_timestamp(&version.created_at)?;
    }
    Ok(())
}

fn insert_version(
    conn: &Connection,
    effect: i64,
    version: i64,
    created_at: &DateTime<Utc>,
    code: &str,
) -> StoreResult<()> {
    conn.prepare_cached(
        "INSERT INTO versions (effect, version, created_at, code) VALUES (?1, ?2, ?3, ?4)",
    )?
    .execute(params![effect, version, format_datetime(created_at), code])?;
    Ok(())
}

/// Get an effect with all of its versions.
pub fn get_effect(conn: &Connection, id: i64) -> StoreResult<Option<Effect>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {EFFECT_COLUMNS} FROM effects WHERE id = ?1"
    ))?;
    let effect = stmt.query_row(params![id], effect_from_row).optional()?;

    let Some(mut effect) = effect else {
        return Ok(None);
    };
    effect.versions = list_versions(conn, id)?;
    Ok(Some(effect))
}

/// List the versions of one effect in ledger order.
pub fn list_versions(conn: &Connection, effect: i64) -> StoreResult<Vec<Version>> {
    let mut stmt = conn.prepare_cached(
        "SELECT created_at, code FROM versions WHERE effect = ?1 ORDER BY version ASC",
    )?;
    let versions = stmt
        .query_map(params![effect], |row| {
            Ok(Version {
                created_at: parse_datetime(row, 0)?,
                code: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(versions)
}

/// Page through effects, most recently modified first.
///
/// Hidden effects are filtered before LIMIT/OFFSET so page boundaries of the
/// public view do not move when moderation state changes.
pub fn page_effects(
    conn: &Connection,
    number: usize,
    size: usize,
    include_hidden: bool,
) -> StoreResult<Vec<Effect>> {
    let Some((limit, offset)) = page_window(number, size) else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {EFFECT_COLUMNS} FROM effects
         WHERE ?1 OR hidden = 0
         ORDER BY modified_at DESC, id ASC
         LIMIT ?2 OFFSET ?3"
    ))?;
    let effects = stmt
        .query_map(params![include_hidden, limit, offset], effect_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    attach_versions(conn, effects)
}

/// Page through an effect and its direct forks, regardless of hidden state.
pub fn page_siblings(
    conn: &Connection,
    number: usize,
    size: usize,
    parent: i64,
) -> StoreResult<Vec<Effect>> {
    let Some((limit, offset)) = page_window(number, size) else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {EFFECT_COLUMNS} FROM effects
         WHERE id = ?1 OR parent = ?1
         ORDER BY modified_at DESC, id ASC
         LIMIT ?2 OFFSET ?3"
    ))?;
    let effects = stmt
        .query_map(params![parent, limit, offset], effect_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    attach_versions(conn, effects)
}

/// Count effects, optionally including hidden ones.
pub fn count_effects(conn: &Connection, include_hidden: bool) -> StoreResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM effects WHERE ?1 OR hidden = 0",
        params![include_hidden],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Count an effect and its direct forks, regardless of hidden state.
pub fn count_siblings(conn: &Connection, parent: i64) -> StoreResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM effects WHERE id = ?1 OR parent = ?1",
        params![parent],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Set the moderation flag. Returns false when no effect matched.
pub fn set_hidden(conn: &Connection, id: i64, hidden: bool) -> StoreResult<bool> {
    let count = conn.execute(
        "UPDATE effects SET hidden = ?1 WHERE id = ?2",
        params![hidden, id],
    )?;
    Ok(count > 0)
}

/// Load versions for a page of effects with a single query.
fn attach_versions(conn: &Connection, mut effects: Vec<Effect>) -> StoreResult<Vec<Effect>> {
    if effects.is_empty() {
        return Ok(effects);
    }

    let placeholders = std::iter::repeat("?")
        .take(effects.len())
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT effect, created_at, code FROM versions
         WHERE effect IN ({})
         ORDER BY effect, version ASC",
        placeholders
    );

    let ids: Vec<i64> = effects.iter().map(|e| e.id).collect();
    let params_vec: Vec<&dyn rusqlite::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_vec.as_slice(), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Version {
                created_at: parse_datetime(row, 1)?,
                code: row.get(2)?,
            },
        ))
    })?;

    let mut by_effect: HashMap<i64, Vec<Version>> = HashMap::with_capacity(effects.len());
    for row in rows {
        let (effect, version) = row?;
        by_effect.entry(effect).or_default().push(version);
    }

    for effect in &mut effects {
        effect.versions = by_effect.remove(&effect.id).unwrap_or_default();
    }
    Ok(effects)
}

/// LIMIT and OFFSET for a page, or None when the window is empty or
/// falls outside the addressable range.
pub(crate) fn page_window(number: usize, size: usize) -> Option<(i64, i64)> {
    if size == 0 {
        return None;
    }
    let offset = number.checked_mul(size)?;
    Some((i64::try_from(size).ok()?, i64::try_from(offset).ok()?))
}

fn effect_from_row(row: &Row<'_>) -> rusqlite::Result<Effect> {
    let parent: Option<i64> = row.get(3)?;
    let parent_version: Option<i64> = row.get(4)?;
    Ok(Effect {
        id: row.get(0)?,
        created_at: parse_datetime(row, 1)?,
        modified_at: parse_datetime(row, 2)?,
        parent: parent.map(|id| ParentRef {
            id,
            version: parent_version.unwrap_or(0),
        }),
        owner: row.get(5)?,
        hidden: row.get(6)?,
        versions: Vec::new(),
    })
}

// ==========================================
// Users
// ==========================================

const USER_COLUMNS: &str =
    "id, name, password, email, role, active, created_at, provider, provider_id";

/// Insert a new user, returning its id.
pub fn insert_user(conn: &Connection, user: &NewUser) -> StoreResult<i64> {
    user.validate().map_err(StoreError::InvalidData)?;
    let created_at = user.created_at.unwrap_or_else(Utc::now);
    conn.execute(
        "INSERT INTO users (name, password, email, role, active, created_at, provider, provider_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.name,
            user.password,
            user.email,
            user.role.as_str(),
            user.active,
            format_datetime(&created_at),
            user.provider,
            user.provider_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(user_id = id, name = %user.name, "User created");
    Ok(id)
}

/// Get a user by ID.
pub fn get_user(conn: &Connection, id: i64) -> StoreResult<Option<User>> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    Ok(stmt.query_row(params![id], user_from_row).optional()?)
}

/// Get a user by name.
pub fn get_user_by_name(conn: &Connection, name: &str) -> StoreResult<Option<User>> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?1"))?;
    Ok(stmt.query_row(params![name], user_from_row).optional()?)
}

/// Get a user by external identity provider.
pub fn get_user_by_provider(
    conn: &Connection,
    provider: &str,
    provider_id: &str,
) -> StoreResult<Option<User>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE provider = ?1 AND provider_id = ?2"
    ))?;
    Ok(stmt
        .query_row(params![provider, provider_id], user_from_row)
        .optional()?)
}

/// List all users ordered by ID.
pub fn list_users(conn: &Connection) -> StoreResult<Vec<User>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Overwrite a user row. Returns false when no user matched.
pub fn update_user(conn: &Connection, user: &User) -> StoreResult<bool> {
    user.validate().map_err(StoreError::InvalidData)?;
    let count = conn.execute(
        "UPDATE users
         SET name = ?1, password = ?2, email = ?3, role = ?4, active = ?5,
             created_at = ?6, provider = ?7, provider_id = ?8
         WHERE id = ?9",
        params![
            user.name,
            user.password,
            user.email,
            user.role.as_str(),
            user.active,
            format_datetime(&user.created_at),
            user.provider,
            user.provider_id,
            user.id,
        ],
    )?;
    Ok(count > 0)
}

/// Read-modify-write a user inside one transaction.
pub fn update_user_with<F>(conn: &mut Connection, id: i64, f: F) -> StoreResult<User>
where
    F: FnOnce(User) -> User,
{
    with_transaction(conn, |tx| {
        let user = get_user(tx, id)?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        let mut updated = f(user);
        updated.id = id;
        if !update_user(tx, &updated)? {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(updated)
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        password: row.get(2)?,
        email: row.get(3)?,
        role: Role::from_str(&row.get::<_, String>(4)?),
        active: row.get(5)?,
        created_at: parse_datetime(row, 6)?,
        provider: row.get(7)?,
        provider_id: row.get(8)?,
    })
}

// ==========================================
// Helpers
// ==========================================

/// Reject instants [`format_datetime`] cannot render as four-digit years.
pub(crate) fn check_timestamp(dt: &DateTime<Utc>) -> StoreResult<()> {
    if (1..=9999).contains(&dt.year()) {
        Ok(())
    } else {
        Err(StoreError::InvalidData(format!(
            "timestamp {} outside years 1..=9999",
            dt.timestamp_millis()
        )))
    }
}

/// Fixed-width RFC 3339 so text ordering matches chronological ordering.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_constraint(err: rusqlite::Error, what: impl FnOnce() -> String) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::AlreadyExists(what())
        }
        other => other.into(),
    }
}
