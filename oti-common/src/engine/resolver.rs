//! Sample period resolution with a per-load cache

use std::collections::HashMap;

use sqlx::SqliteConnection;

use crate::db::models::{SamplePeriod, SamplePeriodType};
use crate::db::sample_periods::find_sample_period;
use crate::{Error, Result};

/// Resolves sample period identifiers to their configured windows.
///
/// A resolver lives for one load (or one create request). Sample period
/// configuration can change between loads, so never keep one around longer.
#[derive(Debug, Default)]
pub struct SamplePeriodResolver {
    cache: HashMap<SamplePeriodType, SamplePeriod>,
    lookups: usize,
}

impl SamplePeriodResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a raw identifier such as `"morning"`
    pub async fn resolve(
        &mut self,
        conn: &mut SqliteConnection,
        identifier: &str,
    ) -> Result<SamplePeriod> {
        let period_type: SamplePeriodType = identifier.trim().parse()?;
        self.resolve_type(conn, period_type).await
    }

    pub async fn resolve_type(
        &mut self,
        conn: &mut SqliteConnection,
        period_type: SamplePeriodType,
    ) -> Result<SamplePeriod> {
        if let Some(period) = self.cache.get(&period_type) {
            return Ok(period.clone());
        }

        self.lookups += 1;
        let period = find_sample_period(conn, period_type).await?.ok_or_else(|| {
            Error::NotFound(format!("Sample period '{}' is not configured", period_type))
        })?;

        self.cache.insert(period_type, period.clone());
        Ok(period)
    }

    /// Number of database lookups performed so far
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}
