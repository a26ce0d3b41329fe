//! Indicator job creation and status tracking

use sqlx::SqlitePool;

use crate::db::indicators::max_version;
use crate::db::jobs::{insert_job, max_job_version};
use crate::db::models::{IndicatorJob, JobStatus, NewIndicatorJob};
use crate::engine::dispatch::{JobCommand, JobDispatcher};
use crate::{Error, Result};

/// Persist a new job, then hand it to `dispatcher`.
///
/// The job row is committed before dispatch. A dispatch failure is logged
/// and does not undo the job or fail the call.
pub async fn create_job(
    pool: &SqlitePool,
    dispatcher: &dyn JobDispatcher,
    request: NewIndicatorJob,
) -> Result<IndicatorJob> {
    let request = request.normalized();

    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let version = match request.version {
        Some(v) => v,
        None => next_version(&mut *tx).await?,
    };

    let job = insert_job(&mut *tx, version, request.city_name.as_deref()).await?;
    tx.commit().await?;

    tracing::info!(
        job_id = job.id,
        version = job.version,
        city_name = job.city_name.as_deref().unwrap_or("<local>"),
        "Indicator job created"
    );

    match dispatcher.dispatch(JobCommand::from(&job)) {
        Ok(()) => tracing::info!(job_id = job.id, "Indicator job dispatched"),
        Err(err) => tracing::error!(
            job_id = job.id,
            error = %err,
            "Indicator job dispatch failed; job kept but will not run"
        ),
    }

    Ok(job)
}

/// One past the highest version claimed by any job or indicator row
async fn next_version(conn: &mut sqlx::SqliteConnection) -> Result<u32> {
    let job_max = max_job_version(&mut *conn).await?;
    let indicator_max = max_version(&mut *conn).await?.map(i64::from);

    match job_max.max(indicator_max) {
        None => Ok(0),
        Some(v) => u32::try_from(v + 1)
            .map_err(|_| Error::Conflict("Indicator version space exhausted".to_string())),
    }
}

/// Record the worker's progress or completion report
pub async fn report_job_status(
    pool: &SqlitePool,
    id: i64,
    status: JobStatus,
    calculation_status: Option<serde_json::Value>,
) -> Result<IndicatorJob> {
    let job = crate::db::jobs::update_job_status(pool, id, status, calculation_status).await?;

    if status.is_finished() {
        tracing::info!(job_id = id, version = job.version, status = ?status, "Indicator job finished");
    } else {
        tracing::debug!(job_id = id, status = ?status, "Indicator job status updated");
    }

    Ok(job)
}
