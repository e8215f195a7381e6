use thiserror::Error;

/// Top-level error type for the Gauntlet library.
#[derive(Debug, Error)]
pub enum GauntletError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Timed out after {secs}s")]
    TimedOut { secs: u64 },
}

impl ModelError {
    /// Whether retrying the call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ApiRequest(_) | Self::RateLimited { .. } | Self::TimedOut { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GauntletError>;
