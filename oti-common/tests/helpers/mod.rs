//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use oti_common::db::sample_periods::upsert_sample_period;
use oti_common::db::{
    init_database, AggregationType, DatabaseOptions, IndicatorType, NewIndicator, SamplePeriodType,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Temporary database with the schema applied and no sample periods.
///
/// The TempDir must stay alive for the duration of the test.
pub async fn create_empty_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("test_indicators.db");
    let pool = init_database(&db_path, &DatabaseOptions::default())
        .await
        .expect("database init");
    (temp_dir, pool)
}

/// Temporary database with every sample period configured
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let (temp_dir, pool) = create_empty_db().await;
    for period_type in SamplePeriodType::ALL {
        configure_period(&pool, period_type).await;
    }
    (temp_dir, pool)
}

/// Configure one sample period with a fixed two-hour window
pub async fn configure_period(pool: &SqlitePool, period_type: SamplePeriodType) {
    let offset = SamplePeriodType::ALL
        .iter()
        .position(|t| *t == period_type)
        .unwrap_or(0) as i64;
    let start = Utc.with_ymd_and_hms(2014, 1, 6, 6, 0, 0).unwrap() + Duration::hours(offset * 3);
    upsert_sample_period(pool, period_type, start, start + Duration::hours(2))
        .await
        .expect("sample period");
}

/// A local-feed system indicator
pub fn system_indicator(indicator_type: IndicatorType, version: u32) -> NewIndicator {
    NewIndicator {
        sample_period: SamplePeriodType::Morning,
        indicator_type,
        aggregation: AggregationType::System,
        route_id: None,
        route_type: None,
        city_bounded: false,
        city_name: None,
        version,
        value: 1.0,
    }
}

/// The three-row Springfield import, header line included
pub const SPRINGFIELD_CSV: &str = "\
aggregation,city_bounded,city_name,route_id,route_type,sample_period,type,value,version
route,false,,R1,,morning,coverage,0.5,1
mode,false,,,3,evening,num_stops,12,1
system,true,,,,,length,42,1
";
