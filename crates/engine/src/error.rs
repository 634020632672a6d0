use std::fmt;

use rakeline_core::CoreError;
use rakeline_storage::StorageError;
use thiserror::Error;

use crate::backend::BackendError;
use crate::validate::ValidationFailure;

/// The server record could not be fetched or decoded; no partial state is
/// produced.
#[derive(Debug, Error)]
#[error("could not load {unit}: {source}")]
pub struct LoadFailure {
    pub unit: String,
    #[source]
    pub source: BackendError,
}

/// The backend rejected a draft; local edits and the cached draft are kept.
#[derive(Debug, Error)]
#[error("could not save {unit}: {source}")]
pub struct SaveFailure {
    pub unit: String,
    #[source]
    pub source: BackendError,
}

/// [`EditSession::open`](crate::EditSession::open) failed. The collaborators
/// are handed back so a retry starts from the same cache.
pub struct OpenFailure<B, C> {
    pub error: EngineError,
    pub backend: B,
    pub cache: C,
}

impl<B, C> OpenFailure<B, C> {
    pub fn into_parts(self) -> (EngineError, B, C) {
        (self.error, self.backend, self.cache)
    }
}

impl<B, C> fmt::Debug for OpenFailure<B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFailure").field("error", &self.error).finish_non_exhaustive()
    }
}

impl<B, C> fmt::Display for OpenFailure<B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<B, C> std::error::Error for OpenFailure<B, C> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl<B, C> From<OpenFailure<B, C>> for EngineError {
    fn from(failure: OpenFailure<B, C>) -> Self {
        failure.error
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error(transparent)]
    Load(#[from] LoadFailure),

    #[error(transparent)]
    Save(#[from] SaveFailure),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("field {field} cannot be edited in this mode")]
    FieldLocked { field: &'static str },

    #[error("at least one row is required")]
    LastRow,

    #[error("split negotiation unavailable: {0}")]
    SplitUnavailable(&'static str),

    #[error("split request failed: {0}")]
    Split(#[source] BackendError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("edit session is closed")]
    SessionClosed,
}
