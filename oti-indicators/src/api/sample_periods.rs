//! Sample period configuration endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use oti_common::db::sample_periods::{get_sample_period, list_sample_periods, upsert_sample_period};
use oti_common::db::{SamplePeriod, SamplePeriodType};
use serde::Deserialize;

use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SamplePeriodWindow {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

/// GET /api/sample-periods/
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<SamplePeriod>>> {
    Ok(Json(list_sample_periods(&state.db).await?))
}

/// GET /api/sample-periods/:type
pub async fn get_one(
    State(state): State<AppState>,
    Path(period_type): Path<String>,
) -> ApiResult<Json<SamplePeriod>> {
    let period_type: SamplePeriodType = period_type.parse()?;
    Ok(Json(get_sample_period(&state.db, period_type).await?))
}

/// PUT /api/sample-periods/:type
///
/// Later loads resolve against the new window; loads already running keep
/// the one they looked up.
pub async fn configure(
    State(state): State<AppState>,
    Path(period_type): Path<String>,
    payload: Result<Json<SamplePeriodWindow>, JsonRejection>,
) -> ApiResult<Json<SamplePeriod>> {
    let period_type: SamplePeriodType = period_type.parse()?;
    let Json(window) = payload?;

    let period =
        upsert_sample_period(&state.db, period_type, window.period_start, window.period_end).await?;
    Ok(Json(period))
}

pub fn sample_period_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sample-periods/", get(list))
        .route("/api/sample-periods/:type", get(get_one).put(configure))
}
