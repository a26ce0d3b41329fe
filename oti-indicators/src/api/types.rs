//! Value to label maps for the fixed vocabularies

use std::collections::BTreeMap;

use axum::{routing::get, Json, Router};
use oti_common::db::{AggregationType, IndicatorType, SamplePeriodType};

use crate::AppState;

type LabelMap = BTreeMap<&'static str, &'static str>;

/// GET /api/indicator-types/
pub async fn indicator_types() -> Json<LabelMap> {
    Json(IndicatorType::all().map(|t| (t.as_str(), t.label())).collect())
}

/// GET /api/indicator-aggregation-types/
pub async fn aggregation_types() -> Json<LabelMap> {
    Json(
        AggregationType::ALL
            .iter()
            .map(|t| (t.as_str(), t.label()))
            .collect(),
    )
}

/// GET /api/sample-period-types/
pub async fn sample_period_types() -> Json<LabelMap> {
    Json(
        SamplePeriodType::ALL
            .iter()
            .map(|t| (t.as_str(), t.label()))
            .collect(),
    )
}

pub fn type_routes() -> Router<AppState> {
    Router::new()
        .route("/api/indicator-types/", get(indicator_types))
        .route("/api/indicator-aggregation-types/", get(aggregation_types))
        .route("/api/sample-period-types/", get(sample_period_types))
}
