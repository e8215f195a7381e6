use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gauntlet_core::types::{
    Experiment, NewExperiment, NewTestCase, ResponseMetrics, RunRecord, RunRow, TestCase,
};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExperimentRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub system_prompt: String,
    #[serde(default)]
    pub models: Vec<String>,
    /// Legacy single-model field, folded into `models`.
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub test_case_ids: Vec<Uuid>,
}

impl CreateExperimentRequest {
    pub fn into_new_experiment(self) -> Result<NewExperiment, AppError> {
        let mut models = self.models;
        if let Some(model) = self.llm_model {
            if !models.contains(&model) {
                models.push(model);
            }
        }
        if models.is_empty() {
            return Err(AppError::BadRequest(
                "at least one model is required (models or llmModel)".into(),
            ));
        }
        Ok(NewExperiment {
            name: self.name.unwrap_or_default(),
            system_prompt: self.system_prompt,
            models,
            test_case_ids: self.test_case_ids,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestCaseRequest {
    pub user_message: String,
    pub expected_output: String,
    pub grader_type: String,
}

impl From<CreateTestCaseRequest> for NewTestCase {
    fn from(req: CreateTestCaseRequest) -> Self {
        NewTestCase {
            user_message: req.user_message,
            expected_output: req.expected_output,
            grader_kind: req.grader_type.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentDto {
    pub id: Uuid,
    pub name: String,
    pub system_prompt: String,
    pub models: Vec<String>,
    pub test_case_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Experiment> for ExperimentDto {
    fn from(e: Experiment) -> Self {
        Self {
            id: e.id,
            name: e.name,
            system_prompt: e.system_prompt,
            models: e.models,
            test_case_ids: e.test_case_ids,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseDto {
    pub id: Uuid,
    pub user_message: String,
    pub expected_output: String,
    pub grader_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<TestCase> for TestCaseDto {
    fn from(c: TestCase) -> Self {
        Self {
            id: c.id,
            user_message: c.user_message,
            expected_output: c.expected_output,
            grader_type: c.grader_kind.as_str().to_owned(),
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetricsDto {
    pub factuality_score: f64,
    pub relevance_score: f64,
}

impl From<ResponseMetrics> for ResponseMetricsDto {
    fn from(m: ResponseMetrics) -> Self {
        Self {
            factuality_score: m.factuality_score,
            relevance_score: m.relevance_score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRowDto {
    pub test_case_id: Uuid,
    pub model: String,
    pub user_message: String,
    pub expected_output: String,
    pub actual_output: String,
    pub score: f64,
    pub latency_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ResponseMetricsDto>,
}

impl From<RunRow> for RunRowDto {
    fn from(r: RunRow) -> Self {
        Self {
            test_case_id: r.test_case_id,
            model: r.model,
            user_message: r.user_message,
            expected_output: r.expected_output,
            actual_output: r.actual_output,
            score: r.score,
            latency_seconds: r.latency_seconds,
            error: r.error,
            metrics: r.metrics.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub run_id: Uuid,
    pub experiment_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<RunRowDto>,
    pub aggregate_score: Option<f64>,
}

impl From<RunRecord> for RunResponse {
    fn from(record: RunRecord) -> Self {
        let aggregate_score = record.aggregate_score();
        Self {
            run_id: record.id,
            experiment_id: record.experiment_id,
            started_at: record.started_at,
            finished_at: record.finished_at,
            results: record.rows.into_iter().map(Into::into).collect(),
            aggregate_score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummaryDto {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub row_count: usize,
    pub aggregate_score: Option<f64>,
}

impl From<RunRecord> for RunSummaryDto {
    fn from(record: RunRecord) -> Self {
        Self {
            run_id: record.id,
            started_at: record.started_at,
            finished_at: record.finished_at,
            row_count: record.rows.len(),
            aggregate_score: record.aggregate_score(),
        }
    }
}
