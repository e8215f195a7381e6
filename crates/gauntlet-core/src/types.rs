use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a model response is compared against the expected output.
///
/// Unknown wire values are kept as `Other` rather than rejected, so stored
/// data written by a newer version still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GraderKind {
    ExactMatch,
    PartialMatch,
    Other(String),
}

impl GraderKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExactMatch => "exactMatch",
            Self::PartialMatch => "partialMatch",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for GraderKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "exactMatch" => Self::ExactMatch,
            "partialMatch" => Self::PartialMatch,
            _ => Self::Other(s),
        }
    }
}

impl From<GraderKind> for String {
    fn from(kind: GraderKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl std::fmt::Display for GraderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GraderKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

/// A single prompt with its reference answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub user_message: String,
    pub expected_output: String,
    pub grader_kind: GraderKind,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a test case. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTestCase {
    pub user_message: String,
    pub expected_output: String,
    pub grader_kind: GraderKind,
}

/// A system prompt paired with candidate models and the test cases to grade
/// them against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub id: Uuid,
    pub name: String,
    pub system_prompt: String,
    pub models: Vec<String>,
    pub test_case_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an experiment. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExperiment {
    pub name: String,
    pub system_prompt: String,
    pub models: Vec<String>,
    pub test_case_ids: Vec<Uuid>,
}

/// Secondary quality scores from an external metrics evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetrics {
    pub factuality_score: f64,
    pub relevance_score: f64,
}

/// One (test case, model) result within a run.
///
/// A failed invocation still produces a row: score 0, empty output, and a
/// non-empty `error` marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRow {
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
    pub metrics: Option<ResponseMetrics>,
}

/// A persisted run: every (test case, model) row of one execution, ordered by
/// test-case position then model position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows: Vec<RunRow>,
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn aggregate_score(&self) -> Option<f64> {
        aggregate_score(&self.rows)
    }
}

/// Input for persisting a run. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRun {
    pub experiment_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows: Vec<RunRow>,
}

/// Arithmetic mean of row scores. `None` when there are no rows.
pub fn aggregate_score(rows: &[RunRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    Some(rows.iter().map(|r| r.score).sum::<f64>() / rows.len() as f64)
}
