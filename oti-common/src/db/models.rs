//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// The five configured sample period windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SamplePeriodType {
    Morning,
    Midday,
    Evening,
    Night,
    Weekend,
}

impl SamplePeriodType {
    pub const ALL: [SamplePeriodType; 5] = [
        SamplePeriodType::Morning,
        SamplePeriodType::Midday,
        SamplePeriodType::Evening,
        SamplePeriodType::Night,
        SamplePeriodType::Weekend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SamplePeriodType::Morning => "morning",
            SamplePeriodType::Midday => "midday",
            SamplePeriodType::Evening => "evening",
            SamplePeriodType::Night => "night",
            SamplePeriodType::Weekend => "weekend",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            SamplePeriodType::Morning => "Morning Rush",
            SamplePeriodType::Midday => "Mid Day",
            SamplePeriodType::Evening => "Evening Rush",
            SamplePeriodType::Night => "Night",
            SamplePeriodType::Weekend => "Weekend",
        }
    }
}

impl FromStr for SamplePeriodType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::NotFound(format!("Sample period '{}' does not exist", s)))
    }
}

impl fmt::Display for SamplePeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level at which an indicator is aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AggregationType {
    Route,
    Mode,
    System,
}

impl AggregationType {
    pub const ALL: [AggregationType; 3] = [
        AggregationType::Route,
        AggregationType::Mode,
        AggregationType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Route => "route",
            AggregationType::Mode => "mode",
            AggregationType::System => "system",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AggregationType::Route => "Route",
            AggregationType::Mode => "Mode",
            AggregationType::System => "System",
        }
    }
}

impl FromStr for AggregationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("'{}' is not a valid aggregation", s)))
    }
}

/// Kinds of indicator produced by the calculation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum IndicatorType {
    AccessIndex,
    Affordability,
    AvgServiceFreq,
    Coverage,
    CoverageStops,
    DistanceStops,
    DwellTime,
    HoursService,
    JobAccess,
    Length,
    LinesRoads,
    LineNetworkDensity,
    NumModes,
    NumRoutes,
    NumStops,
    NumTypes,
    OnTimePerf,
    RegularityHeadways,
    ServiceFreqWeighted,
    StopsRouteLength,
    SuburbanLines,
    SystemAccess,
    SystemAccessLow,
    TimeTraveledStops,
    TravelTime,
    WeekdayEndFreq,
}

/// (variant, wire name, label)
const INDICATOR_TYPES: [(IndicatorType, &str, &str); 26] = [
    (IndicatorType::AccessIndex, "access_index", "Access index"),
    (IndicatorType::Affordability, "affordability", "Affordability"),
    (IndicatorType::AvgServiceFreq, "avg_service_freq", "Average Service Frequency"),
    (IndicatorType::Coverage, "coverage", "System coverage"),
    (IndicatorType::CoverageStops, "coverage_stops", "Coverage of transit stops"),
    (IndicatorType::DistanceStops, "distance_stops", "Distance between stops"),
    (IndicatorType::DwellTime, "dwell_time", "Dwell Time Performance"),
    (IndicatorType::HoursService, "hours_service", "Weekly number of hours of service"),
    (IndicatorType::JobAccess, "job_access", "Job accessibility"),
    (IndicatorType::Length, "length", "Transit system length"),
    (IndicatorType::LinesRoads, "lines_roads", "Ratio of transit lines length over road length"),
    (IndicatorType::LineNetworkDensity, "line_network_density", "Transit line network density"),
    (IndicatorType::NumModes, "num_modes", "Number of modes"),
    (IndicatorType::NumRoutes, "num_routes", "Number of routes"),
    (IndicatorType::NumStops, "num_stops", "Number of stops"),
    (IndicatorType::NumTypes, "num_types", "Number of route types"),
    (IndicatorType::OnTimePerf, "on_time_perf", "On-Time Performance"),
    (IndicatorType::RegularityHeadways, "regularity_headways", "Regularity of Headways"),
    (
        IndicatorType::ServiceFreqWeighted,
        "service_freq_weighted",
        "Service frequency weighted by served population",
    ),
    (IndicatorType::StopsRouteLength, "stops_route_length", "Ratio of number of stops to route-length"),
    (
        IndicatorType::SuburbanLines,
        "suburban_lines",
        "Ratio of the Transit-Pattern Operating Suburban Lines",
    ),
    (IndicatorType::SystemAccess, "system_access", "System accessibility"),
    (IndicatorType::SystemAccessLow, "system_access_low", "System accessibility - low-income"),
    (IndicatorType::TimeTraveledStops, "time_traveled_stops", "Time traveled between stops"),
    (IndicatorType::TravelTime, "travel_time", "Travel Time Performance"),
    (IndicatorType::WeekdayEndFreq, "weekday_end_freq", "Weekday / weekend frequency"),
];

impl IndicatorType {
    pub fn all() -> impl Iterator<Item = IndicatorType> {
        INDICATOR_TYPES.iter().map(|(t, _, _)| *t)
    }

    fn entry(&self) -> &'static (IndicatorType, &'static str, &'static str) {
        // Table holds every variant
        &INDICATOR_TYPES[*self as usize]
    }

    pub fn as_str(&self) -> &'static str {
        self.entry().1
    }

    pub fn label(&self) -> &'static str {
        self.entry().2
    }
}

impl FromStr for IndicatorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        INDICATOR_TYPES
            .iter()
            .find(|(_, name, _)| *name == s)
            .map(|(t, _, _)| *t)
            .ok_or_else(|| Error::InvalidInput(format!("'{}' is not a valid indicator type", s)))
    }
}

/// A configured sample period window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SamplePeriod {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub period_type: SamplePeriodType,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

/// A persisted indicator value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Indicator {
    pub id: i64,
    pub sample_period: SamplePeriodType,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub indicator_type: IndicatorType,
    pub aggregation: AggregationType,
    pub route_id: Option<String>,
    pub route_type: Option<u32>,
    pub city_bounded: bool,
    pub city_name: Option<String>,
    pub version: u32,
    pub value: f64,
}

/// Maximum stored length of a GTFS route id
pub const ROUTE_ID_MAX_LEN: usize = 32;

/// An indicator value that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIndicator {
    pub sample_period: SamplePeriodType,
    #[serde(rename = "type")]
    pub indicator_type: IndicatorType,
    pub aggregation: AggregationType,
    #[serde(default)]
    pub route_id: Option<String>,
    #[serde(default)]
    pub route_type: Option<u32>,
    #[serde(default)]
    pub city_bounded: bool,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub value: f64,
}

impl NewIndicator {
    /// Empty route ids and city names are stored as NULL so the uniqueness
    /// sentinels never collide with real values.
    pub fn normalized(mut self) -> Self {
        self.route_id = normalize_text(self.route_id);
        self.city_name = normalize_text(self.city_name);
        self
    }

    /// Field checks the type system does not cover
    pub fn validate(&self) -> std::result::Result<(), Vec<crate::FieldError>> {
        let mut errors = Vec::new();
        if let Some(route_id) = &self.route_id {
            if route_id.chars().count() > ROUTE_ID_MAX_LEN {
                errors.push(crate::FieldError::new(
                    "route_id",
                    format!("must be at most {} characters", ROUTE_ID_MAX_LEN),
                ));
            }
        }
        if !self.value.is_finite() {
            errors.push(crate::FieldError::new("value", "must be a finite number"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Lifecycle state of a calculation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

/// A request to compute one version of the indicator set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IndicatorJob {
    pub id: i64,
    pub version: u32,
    pub city_name: Option<String>,
    pub job_status: JobStatus,
    /// Worker-reported progress (period -> indicator -> status)
    #[sqlx(json(nullable))]
    pub calculation_status: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for job creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIndicatorJob {
    /// Explicit version; allocated when absent
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub city_name: Option<String>,
}

impl NewIndicatorJob {
    pub fn normalized(mut self) -> Self {
        self.city_name = normalize_text(self.city_name);
        self
    }
}

/// Filters for indicator retrieval; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorFilter {
    pub sample_period: Option<SamplePeriodType>,
    #[serde(rename = "type")]
    pub indicator_type: Option<IndicatorType>,
    pub aggregation: Option<AggregationType>,
    pub route_id: Option<String>,
    pub route_type: Option<u32>,
    pub city_bounded: Option<bool>,
    pub version: Option<u32>,
    pub city_name: Option<String>,
    /// true selects the local feed (`city_name IS NULL`), false the imports
    pub local_city: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_type_table_matches_variants() {
        for (i, (t, name, _)) in INDICATOR_TYPES.iter().enumerate() {
            assert_eq!(*t as usize, i, "table out of order at {}", name);
            assert_eq!(name.parse::<IndicatorType>().unwrap(), *t);
        }
        assert_eq!(IndicatorType::all().count(), 26);
    }

    #[test]
    fn test_unknown_sample_period_is_not_found() {
        let err = "dawn".parse::<SamplePeriodType>().unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_serde_names_match_wire_names() {
        let json = serde_json::to_string(&IndicatorType::LineNetworkDensity).unwrap();
        assert_eq!(json, "\"line_network_density\"");
        let json = serde_json::to_string(&SamplePeriodType::Weekend).unwrap();
        assert_eq!(json, "\"weekend\"");
    }

    #[test]
    fn test_normalized_blanks_become_null() {
        let record = NewIndicator {
            sample_period: SamplePeriodType::Morning,
            indicator_type: IndicatorType::Coverage,
            aggregation: AggregationType::System,
            route_id: Some("  ".to_string()),
            route_type: None,
            city_bounded: false,
            city_name: Some(String::new()),
            version: 1,
            value: 0.5,
        }
        .normalized();
        assert_eq!(record.route_id, None);
        assert_eq!(record.city_name, None);
    }

    #[test]
    fn test_validate_rejects_long_route_id() {
        let record = NewIndicator {
            sample_period: SamplePeriodType::Morning,
            indicator_type: IndicatorType::Coverage,
            aggregation: AggregationType::Route,
            route_id: Some("R".repeat(33)),
            route_type: None,
            city_bounded: false,
            city_name: None,
            version: 1,
            value: 0.5,
        };
        let errors = record.validate().unwrap_err();
        assert_eq!(errors[0].field, "route_id");
    }
}
