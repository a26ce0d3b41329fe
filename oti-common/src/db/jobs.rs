//! Indicator job persistence

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::{IndicatorJob, JobStatus};
use crate::{Error, Result};

const SELECT_JOBS: &str = r#"
    SELECT id, version, city_name, job_status, calculation_status, created_at, updated_at
    FROM indicator_jobs
"#;

/// Insert a queued job on an open connection
pub async fn insert_job(
    conn: &mut SqliteConnection,
    version: u32,
    city_name: Option<&str>,
) -> Result<IndicatorJob> {
    let now = Utc::now();

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO indicator_jobs (version, city_name, job_status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(version)
    .bind(city_name)
    .bind(JobStatus::Queued)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| Error::from_write(e, &format!("Indicator job for version {}", version)))?;

    Ok(IndicatorJob {
        id,
        version,
        city_name: city_name.map(str::to_string),
        job_status: JobStatus::Queued,
        calculation_status: None,
        created_at: now,
        updated_at: now,
    })
}

/// Highest version any job has claimed
pub async fn max_job_version(conn: &mut SqliteConnection) -> Result<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM indicator_jobs")
        .fetch_one(conn)
        .await?;
    Ok(version)
}

pub async fn get_job(pool: &SqlitePool, id: i64) -> Result<IndicatorJob> {
    let sql = format!("{} WHERE id = ?", SELECT_JOBS);
    sqlx::query_as::<_, IndicatorJob>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Indicator job {} not found", id)))
}

/// Most recently created job
pub async fn latest_job(pool: &SqlitePool) -> Result<IndicatorJob> {
    let sql = format!("{} ORDER BY id DESC LIMIT 1", SELECT_JOBS);
    sqlx::query_as::<_, IndicatorJob>(&sql)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound("No indicator jobs exist".to_string()))
}

/// Record a status report from the worker.
///
/// `calculation_status` is left untouched when `None`.
pub async fn update_job_status(
    pool: &SqlitePool,
    id: i64,
    status: JobStatus,
    calculation_status: Option<serde_json::Value>,
) -> Result<IndicatorJob> {
    let result = sqlx::query(
        r#"
        UPDATE indicator_jobs
        SET job_status = ?,
            calculation_status = COALESCE(?, calculation_status),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(calculation_status.map(Json))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Indicator job {} not found", id)));
    }

    get_job(pool, id).await
}
