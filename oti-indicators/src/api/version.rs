//! Current indicator version

use axum::{extract::State, routing::get, Json, Router};
use oti_common::engine::version::version_info;
use oti_common::engine::VersionInfo;

use crate::{ApiResult, AppState};

/// GET /api/indicator-version/
pub async fn current(State(state): State<AppState>) -> ApiResult<Json<VersionInfo>> {
    Ok(Json(version_info(&state.db).await?))
}

pub fn version_routes() -> Router<AppState> {
    Router::new().route("/api/indicator-version/", get(current))
}
