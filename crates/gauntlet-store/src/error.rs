use thiserror::Error;

/// Store-specific error type for persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl From<StoreError> for gauntlet_core::error::GauntletError {
    fn from(e: StoreError) -> Self {
        gauntlet_core::error::GauntletError::Other(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
