use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gauntlet_core::error::{GauntletError, Result};
use gauntlet_core::types::ResponseMetrics;

/// Secondary evaluator producing factuality/relevance scores for a response.
///
/// Optional collaborator: the run executor calls it per successful response
/// when configured, and degrades to no metrics when it fails.
#[async_trait]
pub trait MetricsEvaluator: Send + Sync {
    async fn evaluate(&self, response: &str, reference: &str) -> Result<ResponseMetrics>;
}

#[derive(Debug, Serialize)]
struct MetricsRequest<'a> {
    response: &'a str,
    reference: &'a str,
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    factuality_score: f64,
    relevance_score: f64,
}

/// HTTP client for a deep-eval style scoring sidecar.
///
/// Posts `{"response", "reference"}` and reads back
/// `{"factuality_score", "relevance_score"}`.
pub struct HttpMetricsEvaluator {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

const DEFAULT_TIMEOUT_SECS: u64 = 10;

impl HttpMetricsEvaluator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn dispatch(&self, response: &str, reference: &str) -> Result<ResponseMetrics> {
        let request = MetricsRequest {
            response,
            reference,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| GauntletError::Metrics(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GauntletError::Metrics(format!("HTTP {status}")));
        }

        let parsed: MetricsResponse = resp
            .json()
            .await
            .map_err(|e| GauntletError::Metrics(e.to_string()))?;

        Ok(ResponseMetrics {
            factuality_score: parsed.factuality_score,
            relevance_score: parsed.relevance_score,
        })
    }
}

#[async_trait]
impl MetricsEvaluator for HttpMetricsEvaluator {
    async fn evaluate(&self, response: &str, reference: &str) -> Result<ResponseMetrics> {
        match tokio::time::timeout(self.timeout, self.dispatch(response, reference)).await {
            Ok(result) => result,
            Err(_) => Err(GauntletError::Metrics(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}
