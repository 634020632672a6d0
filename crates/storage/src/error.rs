use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt draft row: {0}")]
    Corrupt(String),

    #[error("core error: {0}")]
    Core(#[from] rakeline_core::CoreError),
}
