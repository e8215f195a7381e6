//! Groq Chat Completions API integration (OpenAI-compatible wire format).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gauntlet_core::error::{GauntletError, ModelError, Result};
use gauntlet_core::invoker::{Completion, ModelInvoker};

use crate::registry;
use crate::retry::with_retry;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;

// ---------------------------------------------------------------------------
// Groq Chat Completions API request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct GroqRequest {
    pub model: String,
    pub messages: Vec<GroqMessage>,
}

#[derive(Debug, Serialize)]
pub struct GroqMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct GroqResponse {
    pub choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
pub struct GroqChoice {
    pub message: GroqResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct GroqResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroqError {
    pub error: GroqErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct GroqErrorDetail {
    pub message: String,
}

// ---------------------------------------------------------------------------
// GroqClient
// ---------------------------------------------------------------------------

pub struct GroqClient {
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Per-attempt deadline. An attempt that exceeds it fails as `TimedOut`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How many times a transient failure is retried after the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn build_request(&self, model: &str, system_prompt: &str, user_message: &str) -> GroqRequest {
        GroqRequest {
            model: model.into(),
            messages: vec![
                GroqMessage {
                    role: "system".into(),
                    content: system_prompt.into(),
                },
                GroqMessage {
                    role: "user".into(),
                    content: user_message.into(),
                },
            ],
        }
    }

    async fn dispatch(&self, request: &GroqRequest) -> Result<String> {
        let response = self
            .client
            .post(GROQ_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| GauntletError::Model(ModelError::ApiRequest(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read response body".into());
            let error_msg = serde_json::from_str::<GroqError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GauntletError::Model(match status.as_u16() {
                401 => ModelError::Auth(error_msg),
                429 => ModelError::RateLimited {
                    retry_after_secs: None,
                },
                _ => ModelError::ApiRequest(format!("HTTP {status}: {error_msg}")),
            }));
        }

        let api_response: GroqResponse = response
            .json()
            .await
            .map_err(|e| GauntletError::Model(ModelError::InvalidResponse(e.to_string())))?;

        // An empty choices list is a valid, empty completion.
        Ok(api_response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

fn is_transient(err: &GauntletError) -> bool {
    matches!(err, GauntletError::Model(e) if e.is_transient())
}

#[async_trait]
impl ModelInvoker for GroqClient {
    async fn invoke(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<Completion> {
        if !registry::is_supported(model) {
            return Err(GauntletError::Model(ModelError::UnsupportedModel(
                model.into(),
            )));
        }

        let request = self.build_request(model, system_prompt, user_message);
        let start = Instant::now();

        let content = with_retry(self.max_retries, is_transient, || async {
            match tokio::time::timeout(self.timeout, self.dispatch(&request)).await {
                Ok(result) => result,
                Err(_) => Err(GauntletError::Model(ModelError::TimedOut {
                    secs: self.timeout.as_secs(),
                })),
            }
        })
        .await?;

        // Latency covers the full call including any retries.
        Ok(Completion {
            content,
            latency_seconds: start.elapsed().as_secs_f64(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client() -> GroqClient {
        GroqClient::new("test-key")
    }

    #[test]
    fn build_request_roles_in_order() {
        let client = make_client();
        let req = client.build_request(
            "llama-3.3-70b-versatile",
            "You are a helpful assistant",
            "Hello",
        );
        assert_eq!(req.model, "llama-3.3-70b-versatile");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[0].content, "You are a helpful assistant");
        assert_eq!(req.messages[1].role, "user");
        assert_eq!(req.messages[1].content, "Hello");
    }

    #[test]
    fn build_request_serializes_without_extras() {
        let client = make_client();
        let req = client.build_request("gemma2-9b-it", "sys", "msg");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""model":"gemma2-9b-it""#));
        assert!(json.contains(r#""role":"system""#));
        assert!(!json.contains("temperature"));
    }

    #[test]
    fn parse_response_text() {
        let json = r#"{"choices": [{"message": {"content": "Hello!"}}]}"#;
        let resp: GroqResponse = serde_json::from_str(json).unwrap();
        let text = resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        assert_eq!(text, "Hello!");
    }

    #[test]
    fn parse_response_empty_choices() {
        let json = r#"{"choices": []}"#;
        let resp: GroqResponse = serde_json::from_str(json).unwrap();
        let text = resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        assert_eq!(text, "");
    }

    #[test]
    fn parse_response_null_content() {
        let json = r#"{"choices": [{"message": {"content": null}}]}"#;
        let resp: GroqResponse = serde_json::from_str(json).unwrap();
        let text = resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        assert_eq!(text, "");
    }

    #[test]
    fn parse_error_body() {
        let json = r#"{"error": {"message": "Invalid API Key", "type": "invalid_request_error"}}"#;
        let err: GroqError = serde_json::from_str(json).unwrap();
        assert_eq!(err.error.message, "Invalid API Key");
    }

    #[tokio::test]
    async fn unsupported_model_rejected_before_network() {
        let client = make_client();
        let err = client
            .invoke("gpt-4o", "You are terse.", "Hello")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GauntletError::Model(ModelError::UnsupportedModel(_))
        ));
        assert!(err.to_string().contains("gpt-4o"));
    }

    #[test]
    fn builder_overrides() {
        let client = make_client()
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(0);
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.max_retries, 0);
    }
}
