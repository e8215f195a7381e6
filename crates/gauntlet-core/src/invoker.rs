use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A model's reply to a single prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Response text. Empty when the provider returned no content.
    pub content: String,

    /// Wall-clock time of the call in seconds.
    pub latency_seconds: f64,
}

/// Trait for LLM providers that answer a system prompt + user message pair.
///
/// Implementations should handle API communication, request formatting,
/// and response parsing for a specific provider.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send one prompt to the named model and return its completion.
    async fn invoke(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<Completion>;
}
