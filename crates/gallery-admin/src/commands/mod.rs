//! CLI command implementations.

pub mod effects;
pub mod import;
pub mod users;

use crate::output::OutputFormat;
use anyhow::{Context as _, Result};
use gallery_config_and_utils::{Config, Paths};
use gallery_store::{AsyncEffects, PoolConfig, Role, StorePool};
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs: where the data lives and how to behave.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(paths: Paths, config: Config, format: OutputFormat) -> Self {
        Self {
            paths,
            config,
            format,
        }
    }

    /// Open the pooled store used by the importer and the user commands.
    pub fn pool(&self) -> Result<Arc<StorePool>> {
        let path = self.paths.database_file();
        let pool = StorePool::open(&path, pool_config(&self.config))
            .with_context(|| format!("could not open database {}", path.display()))?;
        Ok(Arc::new(pool))
    }

    /// Open the async effect store.
    pub async fn effects(&self) -> Result<AsyncEffects> {
        let path = self.paths.database_file();
        AsyncEffects::open(&path)
            .await
            .with_context(|| format!("could not open database {}", path.display()))
    }

    /// Fail unless writes are allowed.
    pub fn ensure_writable(&self, action: &str) -> Result<()> {
        if self.config.read_only {
            anyhow::bail!("cannot {action}: data directory is read-only (GLSL_READ_ONLY)");
        }
        Ok(())
    }
}

fn pool_config(config: &Config) -> PoolConfig {
    PoolConfig {
        busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        read_only: config.read_only,
        ..PoolConfig::with_max_size(config.pool_max_size)
    }
}

/// Role names accepted on the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RoleArg {
    Admin,
    Moderator,
    User,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::Moderator => Role::Moderator,
            RoleArg::User => Role::User,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_context(read_only: bool) -> (tempfile::TempDir, Context) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());
    let config = Config {
        data_path: dir.path().to_path_buf(),
        read_only,
        ..Config::default()
    };
    (dir, Context::new(paths, config, OutputFormat::Json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_follows_settings() {
        let (_dir, ctx) = test_context(true);
        let config = Config {
            pool_max_size: 3,
            busy_timeout_ms: 1_500,
            ..ctx.config.clone()
        };
        let pool = pool_config(&config);
        assert_eq!(pool.max_size, 3);
        assert_eq!(pool.busy_timeout, Duration::from_millis(1_500));
        assert!(pool.read_only);
    }

    #[test]
    fn read_only_context_opens_read_only_pool() {
        let (_dir, ctx) = test_context(true);
        let pool = ctx.pool().unwrap();
        assert!(pool.is_read_only());
        assert!(gallery_store::SqliteUsers::with_pool(pool).list().unwrap().is_empty());
    }

    #[test]
    fn read_only_blocks_writes() {
        let (_dir, ctx) = test_context(true);
        let err = ctx.ensure_writable("hide effects").unwrap_err();
        assert!(err.to_string().contains("read-only"));

        let (_dir, ctx) = test_context(false);
        assert!(ctx.ensure_writable("hide effects").is_ok());
    }
}
