//! Indicator calculation jobs
//!
//! Creating a job commits it and enqueues it for the worker; the response
//! does not wait for the calculation. The worker reports progress back
//! through PATCH.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use oti_common::db::jobs::{get_job, latest_job};
use oti_common::db::{IndicatorJob, JobStatus, NewIndicatorJob};
use oti_common::engine::jobs::{create_job, report_job_status};
use serde::Deserialize;

use crate::{ApiResult, AppState};

/// Worker status report
#[derive(Debug, Deserialize)]
pub struct JobStatusUpdate {
    pub job_status: JobStatus,
    #[serde(default)]
    pub calculation_status: Option<serde_json::Value>,
}

/// POST /api/indicator-jobs/
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewIndicatorJob>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IndicatorJob>)> {
    let Json(request) = payload?;
    let job = create_job(&state.db, state.dispatcher.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/indicator-jobs/latest
pub async fn latest(State(state): State<AppState>) -> ApiResult<Json<IndicatorJob>> {
    Ok(Json(latest_job(&state.db).await?))
}

/// GET /api/indicator-jobs/:id
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<IndicatorJob>> {
    Ok(Json(get_job(&state.db, id).await?))
}

/// PATCH /api/indicator-jobs/:id
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<JobStatusUpdate>, JsonRejection>,
) -> ApiResult<Json<IndicatorJob>> {
    let Json(update) = payload?;
    let job = report_job_status(&state.db, id, update.job_status, update.calculation_status).await?;
    Ok(Json(job))
}

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/api/indicator-jobs/", post(create))
        .route("/api/indicator-jobs/latest", get(latest))
        .route("/api/indicator-jobs/:id", get(get_one).patch(update_status))
}
