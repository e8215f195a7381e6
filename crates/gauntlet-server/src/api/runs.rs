use axum::extract::{Path, State};
use axum::{Json, Router, routing::get, routing::post};
use uuid::Uuid;

use gauntlet_core::types::{NewRun, TestCase};
use gauntlet_eval::executor::RunExecutor;

use crate::dto::{RunResponse, RunSummaryDto};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/experiments/{id}/run", post(trigger_run))
        .route("/experiments/{id}/runs", get(list_runs))
        .route("/runs/{id}", get(get_run))
}

/// Execute the named experiment and persist the result.
///
/// Per-pair model failures degrade to error rows inside the run, so the
/// response is still a 200; only an unknown experiment or a failed
/// persistence write fails the request.
async fn trigger_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunResponse>, AppError> {
    let experiment = state
        .store
        .get_experiment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Experiment {id} not found")))?;

    let test_cases = resolve_test_cases(&state, &experiment.test_case_ids).await?;
    tracing::info!(
        experiment_id = %experiment.id,
        cases = test_cases.len(),
        models = experiment.models.len(),
        "starting run"
    );

    let mut executor =
        RunExecutor::new(state.invoker.clone()).with_config(state.executor_config.clone());
    if let Some(metrics) = &state.metrics {
        executor = executor.with_metrics(metrics.clone());
    }
    let outcome = executor.execute(&experiment, &test_cases).await;

    let record = state
        .store
        .create_run(NewRun {
            experiment_id: experiment.id,
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            rows: outcome.rows,
        })
        .await?;
    tracing::info!(
        run_id = %record.id,
        rows = record.rows.len(),
        aggregate = ?record.aggregate_score(),
        "run finished"
    );

    Ok(Json(record.into()))
}

/// Dereference the experiment's test case ids. Ids that no longer resolve
/// are skipped with a warning rather than failing the run.
async fn resolve_test_cases(state: &AppState, ids: &[Uuid]) -> Result<Vec<TestCase>, AppError> {
    let mut cases = Vec::with_capacity(ids.len());
    for &id in ids {
        match state.store.get_test_case(id).await? {
            Some(case) => cases.push(case),
            None => tracing::warn!(test_case_id = %id, "test case not found, skipping"),
        }
    }
    Ok(cases)
}

async fn list_runs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RunSummaryDto>>, AppError> {
    state
        .store
        .get_experiment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Experiment {id} not found")))?;

    let runs = state.store.list_runs(id).await?;
    Ok(Json(runs.into_iter().map(Into::into).collect()))
}

async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunResponse>, AppError> {
    let record = state
        .store
        .get_run(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run {id} not found")))?;
    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use gauntlet_core::types::{GraderKind, NewExperiment, NewTestCase};
    use gauntlet_eval::executor::ExecutorConfig;

    use crate::test_support::{failing_state, slow_state, test_state};

    async fn seed(state: &AppState, models: &[&str], cases: &[(&str, &str)]) -> Uuid {
        let mut ids = Vec::new();
        for (message, expected) in cases {
            let case = state
                .store
                .create_test_case(NewTestCase {
                    user_message: (*message).into(),
                    expected_output: (*expected).into(),
                    grader_kind: GraderKind::ExactMatch,
                })
                .await
                .unwrap();
            ids.push(case.id);
        }
        state
            .store
            .create_experiment(NewExperiment {
                name: "seeded".into(),
                system_prompt: "Echo the input.".into(),
                models: models.iter().map(|m| m.to_string()).collect(),
                test_case_ids: ids,
            })
            .await
            .unwrap()
            .id
    }

    async fn post_run(state: AppState, id: Uuid) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(format!("/experiments/{id}/run"))
            .body(Body::empty())
            .unwrap();
        let resp = routes().with_state(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn run_returns_rows_in_source_order() {
        // The echo invoker returns the user message, so the first case hits
        // and the second misses.
        let state = test_state();
        let id = seed(&state, &["model-a", "model-b"], &[("4", "4"), ("q2", "other")]).await;

        let (status, body) = post_run(state, id).await;
        assert_eq!(status, StatusCode::OK);

        let run: RunResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(run.experiment_id, id);
        assert_eq!(run.results.len(), 4);
        assert_eq!(run.results[0].model, "model-a");
        assert_eq!(run.results[1].model, "model-b");
        assert_eq!(run.results[0].user_message, "4");
        assert_eq!(run.results[2].user_message, "q2");
        assert_eq!(run.results[0].score, 1.0);
        assert_eq!(run.results[2].score, 0.0);
        assert!((run.aggregate_score.unwrap() - 0.5).abs() < 1e-10);
        assert!(run.finished_at >= run.started_at);
    }

    #[tokio::test]
    async fn run_of_unknown_experiment_is_404() {
        let (status, body) = post_run(test_state(), Uuid::new_v4()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(err["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn get_on_run_route_is_405() {
        let state = test_state();
        let id = seed(&state, &["model-a"], &[("q", "a")]).await;
        let req = Request::builder()
            .method("GET")
            .uri(format!("/experiments/{id}/run"))
            .body(Body::empty())
            .unwrap();
        let resp = routes().with_state(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn failing_invoker_still_returns_200_with_error_rows() {
        let state = failing_state();
        let id = seed(&state, &["model-a"], &[("q1", "a1"), ("q2", "a2")]).await;

        let (status, body) = post_run(state, id).await;
        assert_eq!(status, StatusCode::OK);

        let run: RunResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(run.results.len(), 2);
        for row in &run.results {
            assert_eq!(row.score, 0.0);
            assert!(row.error.as_deref().unwrap().contains("API request failed"));
        }
    }

    #[tokio::test]
    async fn configured_run_deadline_reaches_the_executor() {
        let state = slow_state().with_executor_config(ExecutorConfig {
            max_concurrency: 1,
            run_deadline: Some(std::time::Duration::from_millis(50)),
        });
        let id = seed(&state, &["model-a"], &[("q1", "a1"), ("q2", "a2")]).await;

        let (status, body) = post_run(state, id).await;
        assert_eq!(status, StatusCode::OK);

        let run: RunResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(run.results.len(), 2);
        for row in &run.results {
            assert_eq!(row.score, 0.0);
            assert_eq!(row.error.as_deref(), Some("run deadline exceeded"));
        }
    }

    #[tokio::test]
    async fn missing_test_case_ids_are_skipped() {
        let state = test_state();
        let case = state
            .store
            .create_test_case(NewTestCase {
                user_message: "4".into(),
                expected_output: "4".into(),
                grader_kind: GraderKind::ExactMatch,
            })
            .await
            .unwrap();
        let experiment = state
            .store
            .create_experiment(NewExperiment {
                name: "dangling".into(),
                system_prompt: "s".into(),
                models: vec!["model-a".into()],
                test_case_ids: vec![case.id, Uuid::new_v4()],
            })
            .await
            .unwrap();

        let (status, body) = post_run(state, experiment.id).await;
        assert_eq!(status, StatusCode::OK);
        let run: RunResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].test_case_id, case.id);
    }

    #[tokio::test]
    async fn run_is_persisted_and_readable_back() {
        let state = test_state();
        let id = seed(&state, &["model-a"], &[("4", "4")]).await;

        let (_, body) = post_run(state.clone(), id).await;
        let run: RunResponse = serde_json::from_slice(&body).unwrap();

        // Single run record
        let req = Request::builder()
            .method("GET")
            .uri(format!("/runs/{}", run.run_id))
            .body(Body::empty())
            .unwrap();
        let resp = routes().with_state(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let fetched: RunResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(fetched.run_id, run.run_id);
        assert_eq!(fetched.results.len(), 1);

        // Run history of the experiment
        let req = Request::builder()
            .method("GET")
            .uri(format!("/experiments/{id}/runs"))
            .body(Body::empty())
            .unwrap();
        let resp = routes().with_state(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let summaries: Vec<RunSummaryDto> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].run_id, run.run_id);
        assert_eq!(summaries[0].row_count, 1);
        assert_eq!(summaries[0].aggregate_score, Some(1.0));
    }

    #[tokio::test]
    async fn get_unknown_run_is_404() {
        let req = Request::builder()
            .method("GET")
            .uri(format!("/runs/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let resp = routes()
            .with_state(test_state())
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_runs_of_unknown_experiment_is_404() {
        let req = Request::builder()
            .method("GET")
            .uri(format!("/experiments/{}/runs", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let resp = routes()
            .with_state(test_state())
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
