//! Sample period configuration

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::{SamplePeriod, SamplePeriodType};
use crate::{Error, FieldError, Result};

/// Create or replace the window for one sample period type
pub async fn upsert_sample_period(
    pool: &SqlitePool,
    period_type: SamplePeriodType,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> Result<SamplePeriod> {
    if period_end <= period_start {
        return Err(Error::Validation(vec![FieldError::new(
            "period_end",
            "must be after period_start",
        )]));
    }

    let period = sqlx::query_as::<_, SamplePeriod>(
        r#"
        INSERT INTO sample_periods (type, period_start, period_end)
        VALUES (?, ?, ?)
        ON CONFLICT(type) DO UPDATE SET
            period_start = excluded.period_start,
            period_end = excluded.period_end
        RETURNING id, type, period_start, period_end
        "#,
    )
    .bind(period_type)
    .bind(period_start)
    .bind(period_end)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        sample_period = %period_type,
        %period_start,
        %period_end,
        "Sample period configured"
    );

    Ok(period)
}

/// All configured sample periods
pub async fn list_sample_periods(pool: &SqlitePool) -> Result<Vec<SamplePeriod>> {
    let periods = sqlx::query_as::<_, SamplePeriod>(
        "SELECT id, type, period_start, period_end FROM sample_periods ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(periods)
}

/// Look up one sample period by type on an open connection
pub async fn find_sample_period(
    conn: &mut SqliteConnection,
    period_type: SamplePeriodType,
) -> Result<Option<SamplePeriod>> {
    let period = sqlx::query_as::<_, SamplePeriod>(
        "SELECT id, type, period_start, period_end FROM sample_periods WHERE type = ?",
    )
    .bind(period_type)
    .fetch_optional(conn)
    .await?;

    Ok(period)
}

/// Look up one sample period by type, failing when it is not configured
pub async fn get_sample_period(
    pool: &SqlitePool,
    period_type: SamplePeriodType,
) -> Result<SamplePeriod> {
    let mut conn = pool.acquire().await?;
    find_sample_period(&mut *conn, period_type)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("Sample period '{}' is not configured", period_type))
        })
}
