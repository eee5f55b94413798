//! The effect repository contract shared by every backend.

use crate::{Effect, NewEffect, StoreResult};

/// Storage for effects and their version ledgers.
///
/// Implementations must make every write atomic: an effect is never
/// visible without its versions, and concurrent appends to one effect
/// produce contiguous version numbers.
pub trait EffectRepository: Send + Sync {
    /// Creates an effect with version 0 set to `effect.code`.
    ///
    /// Returns the allocated effect ID.
    fn create_effect(&self, effect: NewEffect) -> StoreResult<i64>;

    /// Appends a version and bumps `modified_at`.
    ///
    /// Returns the new version number, or `NotFound`.
    fn append_version(&self, id: i64, code: &str) -> StoreResult<i64>;

    /// Inserts an effect verbatim with its own ID and versions.
    ///
    /// Fails with `AlreadyExists` when the ID is taken.
    fn restore_effect(&self, effect: &Effect) -> StoreResult<()>;

    /// Fetches an effect with all versions in ledger order.
    fn get_effect(&self, id: i64) -> StoreResult<Effect>;

    /// Returns page `number` of effects, most recently modified first.
    fn page(&self, number: usize, size: usize, include_hidden: bool) -> StoreResult<Vec<Effect>>;

    /// Returns page `number` of `parent_id` and its direct forks.
    fn page_siblings(&self, number: usize, size: usize, parent_id: i64)
        -> StoreResult<Vec<Effect>>;

    /// Sets the moderation flag, or fails with `NotFound`.
    fn set_hidden(&self, id: i64, hidden: bool) -> StoreResult<()>;

    /// Counts effects, optionally including hidden ones.
    fn count(&self, include_hidden: bool) -> StoreResult<u64>;

    /// Counts `parent_id` and its direct forks, matching `page_siblings`.
    fn count_siblings(&self, parent_id: i64) -> StoreResult<u64>;
}
