//! Structured indicator writes
//!
//! Single and batch creates share the bulk loader's constraint checking:
//! both insert through `db::indicators::insert_indicator`, so a duplicate
//! identity key is a conflict on every path.

use sqlx::SqlitePool;

use crate::db::indicators::insert_indicator;
use crate::db::models::{Indicator, NewIndicator};
use crate::engine::resolver::SamplePeriodResolver;
use crate::{Error, FieldError, Result};

/// Store one indicator
pub async fn create_indicator(pool: &SqlitePool, record: NewIndicator) -> Result<Indicator> {
    let mut created = create_indicators(pool, vec![record]).await?;
    created
        .pop()
        .ok_or_else(|| Error::Internal("Insert returned no row".to_string()))
}

/// Store a batch of indicators in one transaction
///
/// Every record is validated before anything is written. On any failure no
/// record of the batch persists.
pub async fn create_indicators(
    pool: &SqlitePool,
    records: Vec<NewIndicator>,
) -> Result<Vec<Indicator>> {
    let records: Vec<NewIndicator> = records.into_iter().map(NewIndicator::normalized).collect();
    validate_batch(&records)?;

    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    let mut resolver = SamplePeriodResolver::new();
    let mut created = Vec::with_capacity(records.len());

    for record in &records {
        let period = resolver.resolve_type(&mut *tx, record.sample_period).await?;
        match insert_indicator(&mut *tx, &period, record).await {
            Ok(indicator) => created.push(indicator),
            Err(err) => {
                if let Error::Conflict(msg) = &err {
                    tracing::warn!(conflict = %msg, "Indicator create rejected");
                }
                return Err(err);
            }
        }
    }

    tx.commit().await?;

    tracing::debug!(count = created.len(), "Indicators created");
    Ok(created)
}

fn validate_batch(records: &[NewIndicator]) -> Result<()> {
    let single = records.len() == 1;
    let errors: Vec<FieldError> = records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| record.validate().err().map(|errs| (i, errs)))
        .flat_map(|(i, errs)| {
            errs.into_iter().map(move |e| {
                if single {
                    e
                } else {
                    FieldError::new(format!("[{}].{}", i, e.field), e.message)
                }
            })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}
