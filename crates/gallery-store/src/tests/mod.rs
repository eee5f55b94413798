//! Repository contract tests.
//!
//! Every test runs against each backend returned by [`backends`]:
//!
//! - `versions.rs`    - creation, the version ledger and restore
//! - `pagination.rs`  - page ordering, hidden filtering and sibling queries
//! - `import.rs`      - dump import round trips
//! - `concurrency.rs` - parallel appends and ID allocation

mod versions;

use crate::{
    Effect, EffectRepository, MemoryEffects, NewEffect, ParentRef, PoolConfig, SqliteEffects,
    Version,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// A repository under test plus whatever keeps it alive.
pub(crate) struct Backend {
    pub name: &'static str,
    pub repo: Arc<dyn EffectRepository>,
    _dir: Option<TempDir>,
}

pub(crate) fn backends() -> Vec<Backend> {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteEffects::open(&dir.path().join("contract.db"), PoolConfig::default())
        .unwrap();
    vec![
        Backend {
            name: "memory",
            repo: Arc::new(MemoryEffects::new()),
            _dir: None,
        },
        Backend {
            name: "sqlite",
            repo: Arc::new(sqlite),
            _dir: Some(dir),
        },
    ]
}

pub(crate) fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap()
}

/// An effect ready for `restore_effect`, modified at `millis`.
pub(crate) fn fixture(id: i64, millis: i64, parent: Option<i64>, codes: &[&str]) -> Effect {
    Effect {
        id,
        created_at: at(millis),
        modified_at: at(millis),
        parent: parent.map(|id| ParentRef { id, version: 0 }),
        owner: format!("owner-{id}"),
        hidden: false,
        versions: codes
            .iter()
            .enumerate()
            .map(|(i, code)| Version {
                created_at: at(millis + i as i64),
                code: code.to_string(),
            })
            .collect(),
    }
}

pub(crate) fn ids(effects: &[Effect]) -> Vec<i64> {
    effects.iter().map(|e| e.id).collect()
}

pub(crate) fn codes(effect: &Effect) -> Vec<&str> {
    effect.versions.iter().map(|v| v.code.as_str()).collect()
}

/// Create, append, hide and page through one effect.
#[test]
fn basic_workflow() {
    for backend in backends() {
        let repo = &backend.repo;

        let id = repo.create_effect(NewEffect::root("ana", "a")).unwrap();
        assert_eq!(id, 1, "{}", backend.name);

        let created = repo.get_effect(id).unwrap();
        assert_eq!(created.created_at, created.modified_at);
        assert_eq!(created.image_name(), "1.png");

        assert_eq!(repo.append_version(id, "b").unwrap(), 1);
        let effect = repo.get_effect(id).unwrap();
        assert_eq!(codes(&effect), vec!["a", "b"], "{}", backend.name);
        assert!(effect.modified_at > created.modified_at);

        repo.set_hidden(id, true).unwrap();
        assert!(repo.page(0, 10, false).unwrap().is_empty());

        let all = repo.page(0, 10, true).unwrap();
        assert_eq!(ids(&all), vec![id]);
        assert_eq!(all[0].versions.len(), 2);
        assert!(all[0].hidden);

        repo.set_hidden(id, false).unwrap();
        assert_eq!(ids(&repo.page(0, 10, false).unwrap()), vec![id]);
    }
}
