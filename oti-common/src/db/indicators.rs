//! Indicator row storage
//!
//! Low-level statements over the `indicators` table. Writers go through
//! `engine::store` or `engine::loader`, which resolve sample periods and own
//! the transaction.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::db::models::{Indicator, IndicatorFilter, NewIndicator, SamplePeriod};
use crate::{Error, Result};

const SELECT_INDICATORS: &str = r#"
    SELECT i.id, sp.type AS sample_period, i.type, i.aggregation, i.route_id,
           i.route_type, i.city_bounded, i.city_name, i.version, i.value
    FROM indicators i
    JOIN sample_periods sp ON sp.id = i.sample_period_id
"#;

/// Insert one row on an open connection (normally inside a transaction).
///
/// A duplicate identity key fails with [`Error::Conflict`]; nothing is
/// overwritten.
pub async fn insert_indicator(
    conn: &mut SqliteConnection,
    sample_period: &SamplePeriod,
    record: &NewIndicator,
) -> Result<Indicator> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO indicators (
            sample_period_id, type, aggregation, route_id, route_type,
            city_bounded, city_name, version, value
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(sample_period.id)
    .bind(record.indicator_type)
    .bind(record.aggregation)
    .bind(&record.route_id)
    .bind(record.route_type)
    .bind(record.city_bounded)
    .bind(&record.city_name)
    .bind(record.version)
    .bind(record.value)
    .fetch_one(conn)
    .await
    .map_err(|e| Error::from_write(e, &describe(sample_period, record)))?;

    Ok(Indicator {
        id,
        sample_period: sample_period.period_type,
        indicator_type: record.indicator_type,
        aggregation: record.aggregation,
        route_id: record.route_id.clone(),
        route_type: record.route_type,
        city_bounded: record.city_bounded,
        city_name: record.city_name.clone(),
        version: record.version,
        value: record.value,
    })
}

/// Identity key rendered for conflict messages
fn describe(sample_period: &SamplePeriod, record: &NewIndicator) -> String {
    format!(
        "Indicator (sample_period={}, type={}, aggregation={}, route_id={}, route_type={}, city_name={}, version={})",
        sample_period.period_type,
        record.indicator_type.as_str(),
        record.aggregation.as_str(),
        record.route_id.as_deref().unwrap_or("null"),
        record
            .route_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string()),
        record.city_name.as_deref().unwrap_or("null"),
        record.version
    )
}

/// Rows matching every set field of `filter`, ordered by id
pub async fn list_indicators(pool: &SqlitePool, filter: &IndicatorFilter) -> Result<Vec<Indicator>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_INDICATORS);
    qb.push(" WHERE 1 = 1");

    if let Some(sample_period) = filter.sample_period {
        qb.push(" AND sp.type = ").push_bind(sample_period);
    }
    if let Some(indicator_type) = filter.indicator_type {
        qb.push(" AND i.type = ").push_bind(indicator_type);
    }
    if let Some(aggregation) = filter.aggregation {
        qb.push(" AND i.aggregation = ").push_bind(aggregation);
    }
    if let Some(route_id) = &filter.route_id {
        qb.push(" AND i.route_id = ").push_bind(route_id.clone());
    }
    if let Some(route_type) = filter.route_type {
        qb.push(" AND i.route_type = ").push_bind(route_type);
    }
    if let Some(city_bounded) = filter.city_bounded {
        qb.push(" AND i.city_bounded = ").push_bind(city_bounded);
    }
    if let Some(version) = filter.version {
        qb.push(" AND i.version = ").push_bind(version);
    }
    if let Some(city_name) = &filter.city_name {
        qb.push(" AND i.city_name = ").push_bind(city_name.clone());
    }
    match filter.local_city {
        Some(true) => {
            qb.push(" AND i.city_name IS NULL");
        }
        Some(false) => {
            qb.push(" AND i.city_name IS NOT NULL");
        }
        None => {}
    }

    qb.push(" ORDER BY i.id");

    let rows = qb.build_query_as::<Indicator>().fetch_all(pool).await?;
    Ok(rows)
}

pub async fn get_indicator(pool: &SqlitePool, id: i64) -> Result<Indicator> {
    let sql = format!("{} WHERE i.id = ?", SELECT_INDICATORS);
    sqlx::query_as::<_, Indicator>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Indicator {} not found", id)))
}

pub async fn delete_indicator(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM indicators WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Indicator {} not found", id)));
    }
    Ok(())
}

/// Remove an imported city's dataset; returns the number of rows removed
pub async fn delete_city(pool: &SqlitePool, city_name: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM indicators WHERE city_name = ?")
        .bind(city_name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Distinct names of imported cities
pub async fn list_cities(pool: &SqlitePool) -> Result<Vec<String>> {
    let cities = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT city_name FROM indicators WHERE city_name IS NOT NULL ORDER BY city_name",
    )
    .fetch_all(pool)
    .await?;

    Ok(cities)
}

/// Highest version across stored rows
pub async fn max_version<'e, E: SqliteExecutor<'e>>(executor: E) -> Result<Option<u32>> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM indicators")
        .fetch_one(executor)
        .await?;

    version
        .map(|v| {
            u32::try_from(v).map_err(|_| Error::Internal(format!("Stored version {} out of range", v)))
        })
        .transpose()
}
