//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::StoreResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_effects(conn)?;
    }
    if current_version < 2 {
        migrate_v2_users(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: effects and their version ledger.
fn migrate_v1_effects(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v1: effects");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS effects (
            id INTEGER PRIMARY KEY,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            parent INTEGER,
            parent_version INTEGER,
            owner TEXT NOT NULL DEFAULT '',
            hidden INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_effects_modified
            ON effects(modified_at);
        CREATE INDEX IF NOT EXISTS idx_effects_parent
            ON effects(parent);

        CREATE TABLE IF NOT EXISTS versions (
            effect INTEGER NOT NULL REFERENCES effects(id),
            version INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            code TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_versions_effect
            ON versions(effect);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_versions_effect_version
            ON versions(effect, version);
        ",
    )?;

    record_migration(conn, 1, "effects")?;
    Ok(())
}

/// V2: users for the authentication layer.
fn migrate_v2_users(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v2: users");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            password BLOB NOT NULL DEFAULT x'',
            email TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL DEFAULT 'user',
            active INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            provider TEXT NOT NULL,
            provider_id TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_users_name
            ON users(name);
        CREATE INDEX IF NOT EXISTS idx_users_provider_id
            ON users(provider, provider_id);
        ",
    )?;

    record_migration(conn, 2, "users")?;
    Ok(())
}
