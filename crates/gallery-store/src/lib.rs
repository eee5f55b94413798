//! Effect persistence for the shader gallery.
//!
//! This crate provides:
//! - The [`EffectRepository`] contract with SQLite and in-memory backends
//! - An async executor facade for request handlers
//! - The streaming importer for legacy dumps
//! - User accounts for the authentication layer
//! - Schema migrations and shared query helpers
//!
//! # Architecture
//!
//! ## Pooled store
//!
//! [`SqliteEffects`] takes a connection from an r2d2 pool per call. Writes
//! run in `BEGIN IMMEDIATE` transactions, so concurrent appends to one effect
//! are serialized and version numbers stay contiguous.
//!
//! ```ignore
//! let store = SqliteEffects::open(&paths.database_file(), PoolConfig::default())?;
//! let id = store.create_effect(NewEffect::root("ana", code))?;
//! store.append_version(id, edited)?;
//! ```
//!
//! ## Async executor
//!
//! [`AsyncEffects`] runs the same queries on a dedicated SQLite thread.
//! Only SQL belongs inside `call()`.
//!
//! ## Memory store
//!
//! [`MemoryEffects`] keeps everything in a map for tests and throwaway
//! deployments. Each instance owns its ID allocator.

mod error;
mod executor;
mod import;
mod memory;
mod migrations;
mod models;
mod pool;
pub mod queries;
mod repository;
mod sqlite;
mod users;

#[cfg(test)]
mod tests;

pub use error::{ErrorKind, StoreError, StoreResult};
pub use executor::AsyncEffects;
pub use import::{parse_line, ImportConfig, ImportReport, Importer};
pub use memory::MemoryEffects;
pub use migrations::run_migrations;
pub use models::*;
pub use pool::{PoolConfig, StorePool, DEFAULT_BUSY_TIMEOUT};
pub use repository::EffectRepository;
pub use sqlite::SqliteEffects;
pub use users::SqliteUsers;
