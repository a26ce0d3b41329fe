//! Bulk loading of indicator sets from delimited files
//!
//! A load is two phases. Parsing turns every line into a typed
//! [`ParsedRow`] without touching the database. Applying resolves sample
//! periods and inserts all rows inside one `BEGIN IMMEDIATE` transaction, so
//! concurrent readers see the whole batch or none of it. Parsing first means
//! a lock-contention retry replays exactly the same rows.

use std::io::{BufRead, BufReader, Read};

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::indicators::insert_indicator;
use crate::db::models::{
    AggregationType, IndicatorType, NewIndicator, SamplePeriodType, ROUTE_ID_MAX_LEN,
};
use crate::db::retry::retry_on_lock;
use crate::engine::resolver::SamplePeriodResolver;
use crate::{FieldError, Result};

/// Error reported when a load is attempted without a city
pub const CITY_NAME_REQUIRED: &str = "city_name parameter required";

/// Positional column order of the input; header names are never consulted
pub const COLUMNS: [&str; 9] = [
    "aggregation",
    "city_bounded",
    "city_name",
    "route_id",
    "route_type",
    "sample_period",
    "type",
    "value",
    "version",
];

const COL_AGGREGATION: usize = 0;
const COL_CITY_BOUNDED: usize = 1;
const COL_ROUTE_ID: usize = 3;
const COL_ROUTE_TYPE: usize = 4;
const COL_SAMPLE_PERIOD: usize = 5;
const COL_TYPE: usize = 6;
const COL_VALUE: usize = 7;
const COL_VERSION: usize = 8;

/// Outcome of one load call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResult {
    pub success: bool,
    /// Rows persisted; skipped rows never count
    pub count: usize,
    pub errors: Vec<String>,
}

impl LoadResult {
    fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            count: 0,
            errors,
        }
    }
}

/// One input line after parsing, before its sample period is resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub sample_period: String,
    pub aggregation: AggregationType,
    pub indicator_type: IndicatorType,
    pub route_id: Option<String>,
    pub route_type: Option<u32>,
    pub city_bounded: bool,
    pub city_name: String,
    pub version: u32,
    pub value: f64,
}

impl ParsedRow {
    fn to_record(&self, sample_period: SamplePeriodType) -> NewIndicator {
        NewIndicator {
            sample_period,
            indicator_type: self.indicator_type,
            aggregation: self.aggregation,
            route_id: self.route_id.clone(),
            route_type: self.route_type,
            city_bounded: self.city_bounded,
            city_name: Some(self.city_name.clone()),
            version: self.version,
            value: self.value,
        }
    }
}

/// Parse one input line.
///
/// The file's own `city_name` column is replaced by `city_name`. A line with
/// an empty sample period yields `Ok(None)` and is skipped by the caller.
pub fn parse_row<S: AsRef<str>>(
    fields: &[S],
    city_name: &str,
) -> std::result::Result<Option<ParsedRow>, Vec<FieldError>> {
    if fields.len() != COLUMNS.len() {
        return Err(vec![FieldError::new(
            "row",
            format!("expected {} columns, found {}", COLUMNS.len(), fields.len()),
        )]);
    }

    let field = |i: usize| fields[i].as_ref().trim();

    let sample_period = field(COL_SAMPLE_PERIOD);
    if sample_period.is_empty() {
        return Ok(None);
    }

    let mut errors = Vec::new();

    let aggregation = field(COL_AGGREGATION)
        .parse::<AggregationType>()
        .map_err(|_| {
            errors.push(FieldError::new(
                "aggregation",
                format!("'{}' is not one of route, mode, system", field(COL_AGGREGATION)),
            ))
        })
        .ok();

    let indicator_type = field(COL_TYPE)
        .parse::<IndicatorType>()
        .map_err(|_| {
            errors.push(FieldError::new(
                "type",
                format!("'{}' is not a valid indicator type", field(COL_TYPE)),
            ))
        })
        .ok();

    let city_bounded = match parse_bool(field(COL_CITY_BOUNDED)) {
        Some(b) => b,
        None => {
            errors.push(FieldError::new(
                "city_bounded",
                format!("'{}' is not a boolean", field(COL_CITY_BOUNDED)),
            ));
            false
        }
    };

    let route_id = Some(field(COL_ROUTE_ID))
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if let Some(id) = &route_id {
        if id.chars().count() > ROUTE_ID_MAX_LEN {
            errors.push(FieldError::new(
                "route_id",
                format!("must be at most {} characters", ROUTE_ID_MAX_LEN),
            ));
        }
    }

    let route_type = match field(COL_ROUTE_TYPE) {
        "" => None,
        raw => raw
            .parse::<u32>()
            .map_err(|_| {
                errors.push(FieldError::new(
                    "route_type",
                    format!("'{}' is not a non-negative integer", raw),
                ))
            })
            .ok(),
    };

    let value = match field(COL_VALUE).parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            errors.push(FieldError::new(
                "value",
                format!("'{}' is not a number", field(COL_VALUE)),
            ));
            0.0
        }
    };

    let version = field(COL_VERSION)
        .parse::<u32>()
        .map_err(|_| {
            errors.push(FieldError::new(
                "version",
                format!("'{}' is not a non-negative integer", field(COL_VERSION)),
            ))
        })
        .unwrap_or_default();

    match (aggregation, indicator_type) {
        (Some(aggregation), Some(indicator_type)) if errors.is_empty() => Ok(Some(ParsedRow {
            sample_period: sample_period.to_string(),
            aggregation,
            indicator_type,
            route_id,
            route_type,
            city_bounded,
            city_name: city_name.to_string(),
            version,
            value,
        })),
        _ => Err(errors),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "t" => Some(true),
        "false" | "0" | "no" | "f" => Some(false),
        _ => None,
    }
}

/// Loads delimited indicator files into the store
#[derive(Debug, Clone)]
pub struct BulkLoader {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl BulkLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: 5000,
        }
    }

    pub fn with_max_lock_wait(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    /// Load every row of `input` for `city_name`, all or nothing.
    ///
    /// The first line is always discarded as a header. Failures are reported
    /// in [`LoadResult::errors`]; this never returns an error itself.
    pub async fn load<R: Read>(&self, input: R, city_name: &str) -> LoadResult {
        let city_name = city_name.trim();
        if city_name.is_empty() {
            return LoadResult::failed(vec![CITY_NAME_REQUIRED.to_string()]);
        }

        let (rows, skipped) = match parse_input(input, city_name) {
            Ok(parsed) => parsed,
            Err(errors) => {
                tracing::warn!(city_name, ?errors, "Bulk load rejected during parsing");
                return LoadResult::failed(errors);
            }
        };

        tracing::info!(
            city_name,
            rows = rows.len(),
            skipped,
            "Bulk load started"
        );

        let applied = retry_on_lock("bulk load", self.max_lock_wait_ms, || {
            apply_rows(&self.pool, &rows)
        })
        .await;

        match applied {
            Ok(count) => {
                tracing::info!(city_name, count, "Bulk load committed");
                LoadResult {
                    success: true,
                    count,
                    errors: Vec::new(),
                }
            }
            Err(err) => {
                tracing::warn!(city_name, error = %err, "Bulk load rolled back");
                LoadResult::failed(vec![err.to_string()])
            }
        }
    }
}

/// Parse the whole input; returns the rows to insert and the skip count
fn parse_input<R: Read>(
    input: R,
    city_name: &str,
) -> std::result::Result<(Vec<ParsedRow>, usize), Vec<String>> {
    // The first physical line is the header even when blank; csv's own
    // header handling would skip a blank line and take the next one.
    let mut input = BufReader::new(input);
    let mut header = Vec::new();
    input
        .read_until(b'\n', &mut header)
        .map_err(|e| vec![format!("Malformed input: {}", e)])?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| vec![format!("Malformed input: {}", e)])?;
        let fields: Vec<&str> = record.iter().collect();
        match parse_row(&fields, city_name) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => skipped += 1,
            Err(errors) => return Err(errors.iter().map(ToString::to_string).collect()),
        }
    }

    Ok((rows, skipped))
}

/// Insert parsed rows in one transaction; returns the number inserted
async fn apply_rows(pool: &SqlitePool, rows: &[ParsedRow]) -> Result<usize> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    // Fresh per attempt: configuration may have changed since the last load
    let mut resolver = SamplePeriodResolver::new();

    for row in rows {
        let period = resolver.resolve(&mut *tx, &row.sample_period).await?;
        insert_indicator(&mut *tx, &period, &row.to_record(period.period_type)).await?;
    }

    tx.commit().await?;
    Ok(rows.len())
}
