//! oti-indicators library - indicator ingestion and versioning service
//!
//! Stores computed transit indicators, bulk-loads indicator files for
//! imported cities, tracks the current indicator version and hands new
//! calculation jobs to the external worker.

use std::sync::Arc;

use axum::Router;
use oti_common::engine::JobDispatcher;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod relay;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Receives every committed indicator job
    pub dispatcher: Arc<dyn JobDispatcher>,
    /// Retry bound for bulk loads that hit lock contention
    pub max_lock_wait_ms: u64,
}

impl AppState {
    pub fn new(db: SqlitePool, dispatcher: Arc<dyn JobDispatcher>, max_lock_wait_ms: u64) -> Self {
        Self {
            db,
            dispatcher,
            max_lock_wait_ms,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::indicator_routes())
        .merge(api::upload_routes())
        .merge(api::version_routes())
        .merge(api::type_routes())
        .merge(api::sample_period_routes())
        .merge(api::job_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
