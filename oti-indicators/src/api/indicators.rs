//! Indicator create, retrieval and removal endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use oti_common::db::indicators::{
    delete_city, delete_indicator, get_indicator, list_cities, list_indicators,
};
use oti_common::db::{
    AggregationType, Indicator, IndicatorFilter, IndicatorType, NewIndicator, SamplePeriodType,
};
use oti_common::engine::store::{create_indicator, create_indicators};
use oti_common::FieldError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{ApiError, ApiResult, AppState};

/// Create body: one record or a list of them
#[derive(Debug)]
pub enum CreateRequest {
    Batch(Vec<NewIndicator>),
    Single(NewIndicator),
}

impl CreateRequest {
    /// Decode a create body, reporting every field that fails to decode.
    ///
    /// Elements of a list longer than one are reported as `[i].field`, the
    /// same naming the store uses for its own checks.
    pub fn from_value(body: Value) -> Result<Self, Vec<FieldError>> {
        match body {
            Value::Object(record) => decode_record(record, "").map(CreateRequest::Single),
            Value::Array(items) => {
                let indexed = items.len() != 1;
                let mut records = Vec::with_capacity(items.len());
                let mut errors = Vec::new();
                for (i, item) in items.into_iter().enumerate() {
                    let prefix = if indexed { format!("[{}].", i) } else { String::new() };
                    let decoded = match item {
                        Value::Object(record) => decode_record(record, &prefix),
                        _ => Err(vec![FieldError::new(
                            format!("[{}]", i),
                            "expected an indicator object",
                        )]),
                    };
                    match decoded {
                        Ok(record) => records.push(record),
                        Err(e) => errors.extend(e),
                    }
                }
                if errors.is_empty() {
                    Ok(CreateRequest::Batch(records))
                } else {
                    Err(errors)
                }
            }
            _ => Err(vec![FieldError::new(
                "body",
                "expected an indicator object or a list of them",
            )]),
        }
    }
}

fn decode_record(record: Map<String, Value>, prefix: &str) -> Result<NewIndicator, Vec<FieldError>> {
    let mut errors = Vec::new();
    check::<SamplePeriodType>(&record, "sample_period", true, prefix, &mut errors);
    check::<IndicatorType>(&record, "type", true, prefix, &mut errors);
    check::<AggregationType>(&record, "aggregation", true, prefix, &mut errors);
    check::<Option<String>>(&record, "route_id", false, prefix, &mut errors);
    check::<Option<u32>>(&record, "route_type", false, prefix, &mut errors);
    check::<bool>(&record, "city_bounded", false, prefix, &mut errors);
    check::<Option<String>>(&record, "city_name", false, prefix, &mut errors);
    check::<u32>(&record, "version", false, prefix, &mut errors);
    check::<f64>(&record, "value", false, prefix, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value(Value::Object(record))
        .map_err(|e| vec![FieldError::new(format!("{}body", prefix), e.to_string())])
}

fn check<T: DeserializeOwned>(
    record: &Map<String, Value>,
    key: &str,
    required: bool,
    prefix: &str,
    errors: &mut Vec<FieldError>,
) {
    match record.get(key) {
        None if required => {
            errors.push(FieldError::new(format!("{}{}", prefix, key), "this field is required"));
        }
        None => {}
        Some(value) => {
            if let Err(e) = T::deserialize(value) {
                errors.push(FieldError::new(format!("{}{}", prefix, key), e.to_string()));
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateResponse {
    Batch(Vec<Indicator>),
    Single(Indicator),
}

#[derive(Debug, Serialize)]
pub struct DeleteCityResponse {
    pub city_name: String,
    pub deleted: u64,
}

/// POST /api/indicators/
///
/// A list is written atomically; any conflict rejects the whole list.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateResponse>)> {
    let Json(body) = payload?;
    let request = CreateRequest::from_value(body).map_err(ApiError::Validation)?;

    let created = match request {
        CreateRequest::Single(record) => {
            CreateResponse::Single(create_indicator(&state.db, record).await?)
        }
        CreateRequest::Batch(records) => {
            CreateResponse::Batch(create_indicators(&state.db, records).await?)
        }
    };

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/indicators/
pub async fn list(
    State(state): State<AppState>,
    filter: Result<Query<IndicatorFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Indicator>>> {
    let Query(filter) = filter?;
    Ok(Json(list_indicators(&state.db, &filter).await?))
}

/// GET /api/indicators/:id
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Indicator>> {
    Ok(Json(get_indicator(&state.db, id).await?))
}

/// DELETE /api/indicators/:id
pub async fn delete_one(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    delete_indicator(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/indicators/cities/:city_name
///
/// Clears an imported city so a corrected file can be loaded again.
pub async fn remove_city(
    State(state): State<AppState>,
    Path(city_name): Path<String>,
) -> ApiResult<Json<DeleteCityResponse>> {
    let deleted = delete_city(&state.db, &city_name).await?;
    Ok(Json(DeleteCityResponse { city_name, deleted }))
}

/// GET /api/indicator-cities/
pub async fn cities(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(list_cities(&state.db).await?))
}

pub fn indicator_routes() -> Router<AppState> {
    Router::new()
        .route("/api/indicators/", get(list).post(create))
        .route("/api/indicators/:id", get(get_one).delete(delete_one))
        .route("/api/indicators/cities/:city_name", delete(remove_city))
        .route("/api/indicator-cities/", get(cities))
}
