//! Indicator store: uniqueness, scoping and filtered retrieval

mod helpers;

use helpers::{create_empty_db, create_test_db, system_indicator};
use oti_common::db::indicators::{
    delete_city, delete_indicator, get_indicator, list_cities, list_indicators,
};
use oti_common::db::{
    AggregationType, IndicatorFilter, IndicatorType, NewIndicator, SamplePeriodType,
};
use oti_common::engine::store::{create_indicator, create_indicators};
use oti_common::Error;

fn route_indicator(route_id: &str, city_name: Option<&str>) -> NewIndicator {
    NewIndicator {
        sample_period: SamplePeriodType::Evening,
        indicator_type: IndicatorType::Coverage,
        aggregation: AggregationType::Route,
        route_id: Some(route_id.to_string()),
        route_type: None,
        city_bounded: false,
        city_name: city_name.map(str::to_string),
        version: 3,
        value: 0.25,
    }
}

#[tokio::test]
async fn test_duplicate_identity_is_conflict() {
    let (_dir, pool) = create_test_db().await;

    let first = create_indicator(&pool, route_indicator("R1", Some("Springfield")))
        .await
        .unwrap();
    assert_eq!(first.route_id.as_deref(), Some("R1"));

    let mut duplicate = route_indicator("R1", Some("Springfield"));
    duplicate.value = 99.0;
    let err = create_indicator(&pool, duplicate).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);

    // The original value survives
    let stored = get_indicator(&pool, first.id).await.unwrap();
    assert_eq!(stored.value, 0.25);
}

#[tokio::test]
async fn test_null_key_columns_still_collide() {
    let (_dir, pool) = create_test_db().await;

    create_indicator(&pool, system_indicator(IndicatorType::Length, 1))
        .await
        .unwrap();
    let err = create_indicator(&pool, system_indicator(IndicatorType::Length, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn test_empty_city_name_is_stored_as_local() {
    let (_dir, pool) = create_test_db().await;

    let mut record = system_indicator(IndicatorType::NumRoutes, 1);
    record.city_name = Some(String::new());
    let created = create_indicator(&pool, record).await.unwrap();
    assert_eq!(created.city_name, None);

    // Same key with a real NULL now conflicts
    let err = create_indicator(&pool, system_indicator(IndicatorType::NumRoutes, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn test_any_key_difference_avoids_conflict() {
    let (_dir, pool) = create_test_db().await;

    let base = route_indicator("R1", None);
    create_indicator(&pool, base.clone()).await.unwrap();

    let mut other_version = base.clone();
    other_version.version = 4;
    let mut other_city = base.clone();
    other_city.city_name = Some("Shelbyville".to_string());
    let mut other_route = base.clone();
    other_route.route_id = Some("R2".to_string());
    let mut other_period = base.clone();
    other_period.sample_period = SamplePeriodType::Night;

    for record in [other_version, other_city, other_route, other_period] {
        create_indicator(&pool, record).await.unwrap();
    }

    // city_bounded and value are not part of the key
    let mut bounded = base.clone();
    bounded.city_bounded = true;
    assert!(matches!(
        create_indicator(&pool, bounded).await.unwrap_err(),
        Error::Conflict(_)
    ));
}

#[tokio::test]
async fn test_local_city_filter_splits_local_and_imported() {
    let (_dir, pool) = create_test_db().await;

    let local = create_indicator(&pool, route_indicator("R1", None)).await.unwrap();
    let imported = create_indicator(&pool, route_indicator("R1", Some("Springfield")))
        .await
        .unwrap();

    let local_rows = list_indicators(
        &pool,
        &IndicatorFilter {
            local_city: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(local_rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![local.id]);

    let imported_rows = list_indicators(
        &pool,
        &IndicatorFilter {
            local_city: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(
        imported_rows.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![imported.id]
    );
}

#[tokio::test]
async fn test_filters_combine() {
    let (_dir, pool) = create_test_db().await;

    let mut mode_row = system_indicator(IndicatorType::NumStops, 2);
    mode_row.aggregation = AggregationType::Mode;
    mode_row.route_type = Some(3);
    mode_row.sample_period = SamplePeriodType::Evening;
    let mode_row = create_indicator(&pool, mode_row).await.unwrap();

    let mut bounded = system_indicator(IndicatorType::Length, 2);
    bounded.city_bounded = true;
    create_indicator(&pool, bounded).await.unwrap();
    create_indicator(&pool, system_indicator(IndicatorType::Length, 1))
        .await
        .unwrap();

    let rows = list_indicators(
        &pool,
        &IndicatorFilter {
            sample_period: Some(SamplePeriodType::Evening),
            aggregation: Some(AggregationType::Mode),
            route_type: Some(3),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(rows, vec![mode_row]);

    let rows = list_indicators(
        &pool,
        &IndicatorFilter {
            indicator_type: Some(IndicatorType::Length),
            version: Some(2),
            city_bounded: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].city_bounded);

    let all = list_indicators(&pool, &IndicatorFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test]
async fn test_batch_create_is_atomic() {
    let (_dir, pool) = create_test_db().await;

    let err = create_indicators(
        &pool,
        vec![
            system_indicator(IndicatorType::NumModes, 1),
            system_indicator(IndicatorType::NumTypes, 1),
            system_indicator(IndicatorType::NumModes, 1),
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let rows = list_indicators(&pool, &IndicatorFilter::default()).await.unwrap();
    assert!(rows.is_empty(), "partial batch persisted: {:?}", rows);
}

#[tokio::test]
async fn test_batch_validation_reports_indexed_fields() {
    let (_dir, pool) = create_test_db().await;

    let mut bad = route_indicator(&"X".repeat(40), None);
    bad.value = f64::NAN;
    let err = create_indicators(&pool, vec![system_indicator(IndicatorType::Length, 1), bad])
        .await
        .unwrap_err();

    match err {
        Error::Validation(fields) => {
            let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, vec!["[1].route_id", "[1].value"]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unconfigured_sample_period_is_not_found() {
    let (_dir, pool) = create_empty_db().await;

    let err = create_indicator(&pool, system_indicator(IndicatorType::Length, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_get_and_delete() {
    let (_dir, pool) = create_test_db().await;

    let created = create_indicator(&pool, system_indicator(IndicatorType::Affordability, 1))
        .await
        .unwrap();
    assert_eq!(get_indicator(&pool, created.id).await.unwrap(), created);

    delete_indicator(&pool, created.id).await.unwrap();
    assert!(matches!(
        get_indicator(&pool, created.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        delete_indicator(&pool, created.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn test_city_listing_and_removal() {
    let (_dir, pool) = create_test_db().await;

    create_indicator(&pool, route_indicator("R1", Some("Springfield")))
        .await
        .unwrap();
    create_indicator(&pool, route_indicator("R2", Some("Springfield")))
        .await
        .unwrap();
    create_indicator(&pool, route_indicator("R1", Some("Capital City")))
        .await
        .unwrap();
    create_indicator(&pool, route_indicator("R1", None)).await.unwrap();

    assert_eq!(
        list_cities(&pool).await.unwrap(),
        vec!["Capital City".to_string(), "Springfield".to_string()]
    );

    assert_eq!(delete_city(&pool, "Springfield").await.unwrap(), 2);
    assert_eq!(list_cities(&pool).await.unwrap(), vec!["Capital City".to_string()]);

    // The local feed is untouched
    let local = list_indicators(
        &pool,
        &IndicatorFilter {
            local_city: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(local.len(), 1);
}
