//! Current indicator version

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::indicators::max_version;
use crate::Result;

/// Body of the version query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub current_version: Option<u32>,
}

/// Highest version over committed indicator rows, `None` for an empty store.
///
/// Reads only committed data; a load that is still in flight (or was rolled
/// back) never shows up here.
pub async fn current_version(pool: &SqlitePool) -> Result<Option<u32>> {
    max_version(pool).await
}

pub async fn version_info(pool: &SqlitePool) -> Result<VersionInfo> {
    Ok(VersionInfo {
        current_version: current_version(pool).await?,
    })
}
