//! Bulk indicator file upload
//!
//! Accepts a multipart form with a `city_name` text field and a
//! `source_file` file field. The whole file is loaded in one transaction;
//! the response is the [`LoadResult`], with status 200 on success and 400
//! when nothing was stored.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use oti_common::engine::loader::LoadResult;
use oti_common::engine::BulkLoader;

use crate::{ApiResult, AppState};

/// Largest accepted upload body
const UPLOAD_LIMIT_BYTES: usize = 64 * 1024 * 1024;

pub const SOURCE_FILE_REQUIRED: &str = "source_file parameter required";

/// POST /api/indicators/upload
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<LoadResult>)> {
    let mut city_name = String::new();
    let mut source = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("city_name") => city_name = field.text().await?,
            Some("source_file") => {
                tracing::debug!(file_name = ?field.file_name(), "Receiving indicator file");
                source = Some(field.bytes().await?);
            }
            _ => {}
        }
    }

    let result = match source {
        Some(bytes) => {
            BulkLoader::new(state.db.clone())
                .with_max_lock_wait(state.max_lock_wait_ms)
                .load(bytes.as_ref(), &city_name)
                .await
        }
        None => LoadResult {
            success: false,
            count: 0,
            errors: vec![SOURCE_FILE_REQUIRED.to_string()],
        },
    };

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(result)))
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/indicators/upload", post(upload))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
}
