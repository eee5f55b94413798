//! In-memory effect repository.
//!
//! Used for tests and ephemeral deployments. All state lives behind one
//! `RwLock`, including the ID allocator, so each instance is independent.

use crate::queries::{page_window, validate_restore};
use crate::{Effect, EffectRepository, NewEffect, StoreError, StoreResult, Version};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
struct Inner {
    effects: BTreeMap<i64, Effect>,
    /// Last allocated or restored ID.
    last_id: i64,
}

/// Effect repository backed by a map.
#[derive(Default)]
pub struct MemoryEffects {
    inner: RwLock<Inner>,
}

impl MemoryEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect, order and slice the effects that pass `keep`.
    fn paginate<F>(&self, number: usize, size: usize, keep: F) -> Vec<Effect>
    where
        F: Fn(&Effect) -> bool,
    {
        let Some((limit, offset)) = page_window(number, size) else {
            return Vec::new();
        };
        let inner = self.inner.read();
        let mut matching: Vec<&Effect> = inner.effects.values().filter(|e| keep(*e)).collect();
        matching.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then(a.id.cmp(&b.id)));
        matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }
}

impl EffectRepository for MemoryEffects {
    fn create_effect(&self, effect: NewEffect) -> StoreResult<i64> {
        let now = Utc::now();
        let mut inner = self.inner.write();
        inner.last_id += 1;
        let id = inner.last_id;
        inner.effects.insert(
            id,
            Effect {
                id,
                created_at: now,
                modified_at: now,
                parent: effect.parent,
                owner: effect.owner,
                hidden: false,
                versions: vec![Version {
                    created_at: now,
                    code: effect.code,
                }],
            },
        );
        Ok(id)
    }

    fn append_version(&self, id: i64, code: &str) -> StoreResult<i64> {
        let now = Utc::now();
        let mut inner = self.inner.write();
        let effect = inner
            .effects
            .get_mut(&id)
            .ok_or_else(|| StoreError::effect_not_found(id))?;
        effect.versions.push(Version {
            created_at: now,
            code: code.to_string(),
        });
        effect.modified_at = now;
        Ok(effect.versions.len() as i64 - 1)
    }

    fn restore_effect(&self, effect: &Effect) -> StoreResult<()> {
        validate_restore(effect)?;
        let mut inner = self.inner.write();
        if inner.effects.contains_key(&effect.id) {
            return Err(StoreError::AlreadyExists(format!("effect {}", effect.id)));
        }
        inner.last_id = inner.last_id.max(effect.id);
        inner.effects.insert(effect.id, effect.clone());
        Ok(())
    }

    fn get_effect(&self, id: i64) -> StoreResult<Effect> {
        self.inner
            .read()
            .effects
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::effect_not_found(id))
    }

    fn page(&self, number: usize, size: usize, include_hidden: bool) -> StoreResult<Vec<Effect>> {
        Ok(self.paginate(number, size, |e| include_hidden || !e.hidden))
    }

    fn page_siblings(
        &self,
        number: usize,
        size: usize,
        parent_id: i64,
    ) -> StoreResult<Vec<Effect>> {
        Ok(self.paginate(number, size, |e| {
            e.id == parent_id || e.parent.is_some_and(|p| p.id == parent_id)
        }))
    }

    fn set_hidden(&self, id: i64, hidden: bool) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let effect = inner
            .effects
            .get_mut(&id)
            .ok_or_else(|| StoreError::effect_not_found(id))?;
        effect.hidden = hidden;
        Ok(())
    }

    fn count(&self, include_hidden: bool) -> StoreResult<u64> {
        let inner = self.inner.read();
        Ok(inner
            .effects
            .values()
            .filter(|e| include_hidden || !e.hidden)
            .count() as u64)
    }

    fn count_siblings(&self, parent_id: i64) -> StoreResult<u64> {
        let inner = self.inner.read();
        Ok(inner
            .effects
            .values()
            .filter(|e| e.id == parent_id || e.parent.is_some_and(|p| p.id == parent_id))
            .count() as u64)
    }
}
