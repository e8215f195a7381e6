use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use uuid::Uuid;

use crate::dto::{CreateExperimentRequest, CreatedResponse, ExperimentDto};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/experiments", post(create_experiment).get(list_experiments))
        .route("/experiments/{id}", get(get_experiment))
}

async fn create_experiment(
    State(state): State<AppState>,
    Json(req): Json<CreateExperimentRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let new = req.into_new_experiment()?;
    let experiment = state.store.create_experiment(new).await?;
    tracing::info!(experiment_id = %experiment.id, "experiment created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: experiment.id })))
}

async fn list_experiments(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExperimentDto>>, AppError> {
    let experiments = state.store.list_experiments().await?;
    Ok(Json(experiments.into_iter().map(Into::into).collect()))
}

async fn get_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExperimentDto>, AppError> {
    let experiment = state
        .store
        .get_experiment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Experiment {id} not found")))?;
    Ok(Json(experiment.into()))
}
