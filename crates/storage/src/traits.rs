use rakeline_core::{DraftKey, DraftSnapshot};

use crate::error::StorageError;

/// Local persistence for in-progress drafts.
///
/// A pure key/value store: `save` overwrites, nothing merges, nothing
/// expires. Judging whether a draft is stale is the caller's business.
pub trait DraftCache {
    fn save(&mut self, key: &DraftKey, snapshot: &DraftSnapshot) -> Result<(), StorageError>;

    fn load(&self, key: &DraftKey) -> Result<Option<DraftSnapshot>, StorageError>;

    /// Remove the draft under `key`. Returns whether one existed.
    fn clear(&mut self, key: &DraftKey) -> Result<bool, StorageError>;

    fn keys(&self) -> Result<Vec<DraftKey>, StorageError>;
}
