use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::warn;

use gauntlet_core::invoker::ModelInvoker;
use gauntlet_core::types::{Experiment, RunRow, TestCase, aggregate_score};

use crate::grader::{GradeOutcome, grade};
use crate::metrics::MetricsEvaluator;

/// Tuning knobs for a run.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of (test case, model) invocations in flight at once.
    pub max_concurrency: usize,
    /// Overall wall-clock budget for the run. Pairs still pending when it
    /// expires are marked timed out instead of left hanging.
    pub run_deadline: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            run_deadline: None,
        }
    }
}

/// The in-memory result of one run, before persistence.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows: Vec<RunRow>,
}

impl RunOutcome {
    /// Mean row score; `None` when the run had no rows.
    pub fn aggregate_score(&self) -> Option<f64> {
        aggregate_score(&self.rows)
    }
}

/// Executes the (test case × model) cross-product of an experiment.
///
/// Invocations run concurrently under a semaphore bound; every pair yields a
/// row no matter what happened to it, so a bad model call never loses the
/// rest of the run. Rows come back in source order: test-case position first,
/// then model position.
pub struct RunExecutor {
    invoker: Arc<dyn ModelInvoker>,
    metrics: Option<Arc<dyn MetricsEvaluator>>,
    config: ExecutorConfig,
}

impl RunExecutor {
    pub fn new(invoker: Arc<dyn ModelInvoker>) -> Self {
        Self {
            invoker,
            metrics: None,
            config: ExecutorConfig::default(),
        }
    }

    /// Attach a secondary metrics evaluator, called per successful response.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsEvaluator>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run every test case against every model of the experiment.
    ///
    /// Infallible by construction: per-pair failures (provider errors,
    /// timeouts, unsupported grader kinds) degrade to rows with score 0 and
    /// an error marker.
    pub async fn execute(&self, experiment: &Experiment, test_cases: &[TestCase]) -> RunOutcome {
        let started_at = Utc::now();
        let deadline = self.config.run_deadline.map(|d| Instant::now() + d);
        let sem = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        let mut handles = Vec::new();
        for case in test_cases {
            for model in &experiment.models {
                let sem = Arc::clone(&sem);
                let invoker = Arc::clone(&self.invoker);
                let metrics = self.metrics.clone();
                let system_prompt = experiment.system_prompt.clone();
                let task_case = case.clone();
                let task_model = model.clone();

                let handle = tokio::spawn(async move {
                    let work = async {
                        // Queueing counts against the deadline, so a pair
                        // that never got a permit still times out.
                        let _permit = sem.acquire_owned().await.ok();
                        run_pair(
                            invoker,
                            metrics.as_deref(),
                            &system_prompt,
                            &task_case,
                            &task_model,
                        )
                        .await
                    };
                    match deadline {
                        Some(deadline) => match tokio::time::timeout_at(deadline, work).await {
                            Ok(row) => row,
                            Err(_) => timed_out_row(&task_case, &task_model),
                        },
                        None => work.await,
                    }
                });
                handles.push((case.clone(), model.clone(), handle));
            }
        }

        let mut rows = Vec::with_capacity(handles.len());
        for (case, model, handle) in handles {
            let row = match handle.await {
                Ok(row) => row,
                Err(e) => {
                    warn!(test_case_id = %case.id, model = %model, error = %e, "invocation task failed");
                    failed_row(&case, &model, format!("task failed: {e}"))
                }
            };
            rows.push(row);
        }

        RunOutcome {
            started_at,
            finished_at: Utc::now(),
            rows,
        }
    }
}

async fn run_pair(
    invoker: Arc<dyn ModelInvoker>,
    metrics: Option<&dyn MetricsEvaluator>,
    system_prompt: &str,
    case: &TestCase,
    model: &str,
) -> RunRow {
    let completion = match invoker.invoke(model, system_prompt, &case.user_message).await {
        Ok(completion) => completion,
        Err(e) => {
            warn!(test_case_id = %case.id, model, error = %e, "model invocation failed");
            return failed_row(case, model, e.to_string());
        }
    };

    let (score, error) = match grade(&case.expected_output, &completion.content, &case.grader_kind)
    {
        GradeOutcome::Scored(score) => (score, None),
        GradeOutcome::Unsupported(kind) => {
            warn!(test_case_id = %case.id, kind, "unsupported grader kind");
            (0.0, Some(format!("unsupported grader kind: {kind}")))
        }
    };

    let row_metrics = match metrics {
        Some(evaluator) => {
            match evaluator
                .evaluate(&completion.content, &case.expected_output)
                .await
            {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!(test_case_id = %case.id, model, error = %e, "metrics evaluation failed");
                    None
                }
            }
        }
        None => None,
    };

    RunRow {
        test_case_id: case.id,
        model: model.to_owned(),
        user_message: case.user_message.clone(),
        expected_output: case.expected_output.clone(),
        actual_output: completion.content,
        score,
        latency_seconds: completion.latency_seconds,
        error,
        metrics: row_metrics,
    }
}

fn failed_row(case: &TestCase, model: &str, error: String) -> RunRow {
    RunRow {
        test_case_id: case.id,
        model: model.to_owned(),
        user_message: case.user_message.clone(),
        expected_output: case.expected_output.clone(),
        actual_output: String::new(),
        score: 0.0,
        latency_seconds: 0.0,
        error: Some(error),
        metrics: None,
    }
}

fn timed_out_row(case: &TestCase, model: &str) -> RunRow {
    failed_row(case, model, "run deadline exceeded".into())
}
