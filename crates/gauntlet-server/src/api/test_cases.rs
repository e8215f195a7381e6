use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};

use crate::dto::{CreateTestCaseRequest, CreatedResponse, TestCaseDto};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/test-cases", post(create_test_case).get(list_test_cases))
}

async fn create_test_case(
    State(state): State<AppState>,
    Json(req): Json<CreateTestCaseRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let case = state.store.create_test_case(req.into()).await?;
    tracing::info!(test_case_id = %case.id, "test case created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: case.id })))
}

async fn list_test_cases(
    State(state): State<AppState>,
) -> Result<Json<Vec<TestCaseDto>>, AppError> {
    let cases = state.store.list_test_cases().await?;
    Ok(Json(cases.into_iter().map(Into::into).collect()))
}
