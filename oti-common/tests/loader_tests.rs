//! Bulk load: skip semantics, atomicity and concurrent writers

mod helpers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use helpers::{configure_period, create_empty_db, create_test_db, SPRINGFIELD_CSV};
use oti_common::db::indicators::list_indicators;
use oti_common::db::{AggregationType, IndicatorFilter, IndicatorType, SamplePeriodType};
use oti_common::engine::loader::CITY_NAME_REQUIRED;
use oti_common::engine::{current_version, BulkLoader};

const HEADER: &str = "aggregation,city_bounded,city_name,route_id,route_type,sample_period,type,value,version\n";

async fn all_rows(pool: &sqlx::SqlitePool) -> Vec<oti_common::db::Indicator> {
    list_indicators(pool, &IndicatorFilter::default()).await.unwrap()
}

#[tokio::test]
async fn test_springfield_scenario() {
    let (_dir, pool) = create_test_db().await;
    let loader = BulkLoader::new(pool.clone());

    let result = loader.load(SPRINGFIELD_CSV.as_bytes(), "Springfield").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.count, 2);
    assert!(result.errors.is_empty());

    let rows = all_rows(&pool).await;
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|r| r.city_name.as_deref() == Some("Springfield")));

    assert_eq!(rows[0].aggregation, AggregationType::Route);
    assert_eq!(rows[0].route_id.as_deref(), Some("R1"));
    assert_eq!(rows[0].sample_period, SamplePeriodType::Morning);
    assert_eq!(rows[1].indicator_type, IndicatorType::NumStops);
    assert_eq!(rows[1].route_type, Some(3));
    assert_eq!(rows[1].value, 12.0);

    // The skipped system row never landed
    assert!(rows.iter().all(|r| r.indicator_type != IndicatorType::Length));
}

#[tokio::test]
async fn test_unresolvable_sample_period_aborts_batch() {
    let (_dir, pool) = create_test_db().await;
    let input = format!(
        "{}{}{}{}",
        HEADER,
        "route,false,,R1,,morning,coverage,0.5,1\n",
        "route,false,,R2,,sunrise,coverage,0.6,1\n",
        "route,false,,R3,,evening,coverage,0.7,1\n",
    );

    let result = BulkLoader::new(pool.clone())
        .load(input.as_bytes(), "Springfield")
        .await;

    assert!(!result.success);
    assert_eq!(result.count, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("sunrise"), "{:?}", result.errors);
    assert!(all_rows(&pool).await.is_empty());
}

#[tokio::test]
async fn test_unconfigured_sample_period_aborts_batch() {
    let (_dir, pool) = create_empty_db().await;
    configure_period(&pool, SamplePeriodType::Morning).await;

    let input = format!(
        "{}{}{}",
        HEADER, "system,false,,,,morning,length,10,1\n", "system,false,,,,weekend,length,10,1\n",
    );
    let result = BulkLoader::new(pool.clone())
        .load(input.as_bytes(), "Springfield")
        .await;

    assert!(!result.success);
    assert_eq!(result.count, 0);
    assert!(all_rows(&pool).await.is_empty());
}

#[tokio::test]
async fn test_configuration_change_between_loads_is_seen() {
    let (_dir, pool) = create_empty_db().await;
    configure_period(&pool, SamplePeriodType::Morning).await;
    let loader = BulkLoader::new(pool.clone());
    let input = format!("{}{}", HEADER, "system,false,,,,night,length,10,1\n");

    let first = loader.load(input.as_bytes(), "Springfield").await;
    assert!(!first.success);

    configure_period(&pool, SamplePeriodType::Night).await;

    let second = loader.load(input.as_bytes(), "Springfield").await;
    assert!(second.success, "errors: {:?}", second.errors);
    assert_eq!(second.count, 1);
}

#[tokio::test]
async fn test_empty_sample_period_rows_are_skipped_silently() {
    let (_dir, pool) = create_test_db().await;
    let input = format!(
        "{}{}{}",
        HEADER, "system,true,,,,,length,42,1\n", "system,true,,,, ,length,43,1\n",
    );

    let result = BulkLoader::new(pool.clone())
        .load(input.as_bytes(), "Springfield")
        .await;

    assert!(result.success);
    assert_eq!(result.count, 0);
    assert!(result.errors.is_empty());
    assert!(all_rows(&pool).await.is_empty());
}

#[tokio::test]
async fn test_missing_city_name_fails_without_work() {
    let (_dir, pool) = create_test_db().await;
    let loader = BulkLoader::new(pool.clone());

    for city in ["", "   "] {
        let result = loader.load(SPRINGFIELD_CSV.as_bytes(), city).await;
        assert!(!result.success);
        assert_eq!(result.count, 0);
        assert_eq!(result.errors, vec![CITY_NAME_REQUIRED.to_string()]);
    }
    assert!(all_rows(&pool).await.is_empty());
}

#[tokio::test]
async fn test_duplicate_within_file_rolls_back() {
    let (_dir, pool) = create_test_db().await;
    let input = format!(
        "{}{}{}",
        HEADER, "route,false,,R1,,morning,coverage,0.5,1\n", "route,false,,R1,,morning,coverage,0.9,1\n",
    );

    let result = BulkLoader::new(pool.clone())
        .load(input.as_bytes(), "Springfield")
        .await;

    assert!(!result.success);
    assert_eq!(result.count, 0);
    assert!(result.errors[0].starts_with("Conflict"), "{:?}", result.errors);
    assert!(all_rows(&pool).await.is_empty());
}

#[tokio::test]
async fn test_reloading_same_file_conflicts_and_keeps_first() {
    let (_dir, pool) = create_test_db().await;
    let loader = BulkLoader::new(pool.clone());

    assert!(loader.load(SPRINGFIELD_CSV.as_bytes(), "Springfield").await.success);
    let again = loader.load(SPRINGFIELD_CSV.as_bytes(), "Springfield").await;
    assert!(!again.success);
    assert_eq!(again.count, 0);
    assert_eq!(all_rows(&pool).await.len(), 2);

    // A different city coexists with the same rows
    let other = loader.load(SPRINGFIELD_CSV.as_bytes(), "Shelbyville").await;
    assert!(other.success);
    assert_eq!(all_rows(&pool).await.len(), 4);
}

#[tokio::test]
async fn test_malformed_field_aborts_batch() {
    let (_dir, pool) = create_test_db().await;
    let input = format!(
        "{}{}{}",
        HEADER, "route,false,,R1,,morning,coverage,0.5,1\n", "route,false,,R2,,morning,coverage,lots,1\n",
    );

    let result = BulkLoader::new(pool.clone())
        .load(input.as_bytes(), "Springfield")
        .await;

    assert!(!result.success);
    assert_eq!(result.errors, vec!["value: 'lots' is not a number".to_string()]);
    assert!(all_rows(&pool).await.is_empty());
}

#[tokio::test]
async fn test_failed_load_leaves_version_unchanged() {
    let (_dir, pool) = create_test_db().await;
    let loader = BulkLoader::new(pool.clone());
    assert!(loader.load(SPRINGFIELD_CSV.as_bytes(), "Springfield").await.success);

    let input = format!(
        "{}{}{}",
        HEADER, "system,false,,,,morning,length,1,9\n", "system,false,,,,dusk,length,1,9\n",
    );
    assert!(!loader.load(input.as_bytes(), "Springfield").await.success);

    assert_eq!(current_version(&pool).await.unwrap(), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_loads_commit_exactly_once() {
    let (_dir, pool) = create_test_db().await;

    let mut body = String::from(HEADER);
    for i in 0..200 {
        body.push_str(&format!("route,false,,R{},,morning,coverage,0.5,1\n", i));
    }

    let a = BulkLoader::new(pool.clone());
    let b = BulkLoader::new(pool.clone());
    let (first, second) = tokio::join!(
        a.load(body.as_bytes(), "Springfield"),
        b.load(body.as_bytes(), "Springfield")
    );

    let successes = [&first, &second].iter().filter(|r| r.success).count();
    assert_eq!(successes, 1, "first: {:?}, second: {:?}", first, second);

    let loser = if first.success { &second } else { &first };
    assert_eq!(loser.count, 0);
    assert!(loser.errors[0].starts_with("Conflict"), "{:?}", loser.errors);

    assert_eq!(all_rows(&pool).await.len(), 200);
}

#[tokio::test]
async fn test_blank_first_line_does_not_swallow_a_row() {
    let (_dir, pool) = create_test_db().await;
    let input = "\nroute,false,,R1,,morning,coverage,0.5,1\nmode,false,,,3,evening,num_stops,12,1\n";

    let result = BulkLoader::new(pool.clone())
        .load(input.as_bytes(), "Springfield")
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.count, 2);
    let rows = all_rows(&pool).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].route_id.as_deref(), Some("R1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_a_partial_load() {
    const ROWS: usize = 1000;
    let (_dir, pool) = create_test_db().await;

    let mut body = String::from(HEADER);
    for i in 0..ROWS {
        body.push_str(&format!("route,false,,R{},,morning,coverage,0.5,4\n", i));
    }

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let pool = pool.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let mut observed = Vec::new();
            loop {
                let finished = done.load(Ordering::SeqCst);
                let count = all_rows(&pool).await.len();
                let version = current_version(&pool).await.unwrap();
                assert!(count == 0 || count == ROWS, "partial batch visible: {} rows", count);
                assert!(version.is_none() || version == Some(4), "unexpected version {:?}", version);
                observed.push(count);
                if finished {
                    return observed;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let result = BulkLoader::new(pool.clone())
        .load(body.as_bytes(), "Springfield")
        .await;
    done.store(true, Ordering::SeqCst);

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.count, ROWS);

    let observed = reader.await.unwrap();
    assert_eq!(observed.last(), Some(&ROWS));
}
