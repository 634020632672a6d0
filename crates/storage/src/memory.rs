use std::collections::BTreeMap;

use rakeline_core::{DraftKey, DraftSnapshot};

use crate::error::StorageError;
use crate::traits::DraftCache;

/// Process-local draft cache, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryDraftCache {
    drafts: BTreeMap<DraftKey, DraftSnapshot>,
    saves: usize,
}

impl MemoryDraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls served, including overwrites.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl DraftCache for MemoryDraftCache {
    fn save(&mut self, key: &DraftKey, snapshot: &DraftSnapshot) -> Result<(), StorageError> {
        self.drafts.insert(key.clone(), snapshot.clone());
        self.saves += 1;
        Ok(())
    }

    fn load(&self, key: &DraftKey) -> Result<Option<DraftSnapshot>, StorageError> {
        Ok(self.drafts.get(key).cloned())
    }

    fn clear(&mut self, key: &DraftKey) -> Result<bool, StorageError> {
        Ok(self.drafts.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<DraftKey>, StorageError> {
        Ok(self.drafts.keys().cloned().collect())
    }
}
