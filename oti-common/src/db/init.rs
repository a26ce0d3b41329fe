//! Database initialization
//!
//! Opens (creating on first run) the SQLite database and brings the schema up
//! to date. Every statement is idempotent, so this is safe on each startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Connection settings for [`init_database`]
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
            max_connections: 20,
        }
    }
}

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, options: &DatabaseOptions) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas set here apply to every pooled connection.
    // WAL keeps readers off the writer's lock; the busy timeout bounds commit waits.
    let connect_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(options.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .min_connections(1)
        .connect_with(connect_options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    info!(
        busy_timeout_ms = options.busy_timeout.as_millis() as u64,
        "Database ready"
    );

    Ok(pool)
}

/// Create every table and index used by the service
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_sample_periods_table(pool).await?;
    create_indicators_table(pool).await?;
    create_indicator_jobs_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sample_periods_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sample_periods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL UNIQUE
                CHECK (type IN ('morning', 'midday', 'evening', 'night', 'weekend')),
            period_start TIMESTAMP NOT NULL,
            period_end TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Indicator rows and their 7-column uniqueness key
///
/// NULL never equals NULL in a plain UNIQUE constraint, so the nullable key
/// columns are folded to sentinels inside the index. Writers store empty
/// strings as NULL, which keeps the sentinels unambiguous.
async fn create_indicators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indicators (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sample_period_id INTEGER NOT NULL
                REFERENCES sample_periods(id) ON DELETE RESTRICT,
            type TEXT NOT NULL,
            aggregation TEXT NOT NULL CHECK (aggregation IN ('route', 'mode', 'system')),
            route_id TEXT,
            route_type INTEGER CHECK (route_type IS NULL OR route_type >= 0),
            city_bounded BOOLEAN NOT NULL DEFAULT 0,
            city_name TEXT,
            version INTEGER NOT NULL DEFAULT 0 CHECK (version >= 0),
            value REAL NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_indicators_identity ON indicators (
            sample_period_id,
            type,
            aggregation,
            IFNULL(route_id, ''),
            IFNULL(route_type, -1),
            IFNULL(city_name, ''),
            version
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_indicators_version ON indicators(version)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_indicators_city ON indicators(city_name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_indicator_jobs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indicator_jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version INTEGER NOT NULL UNIQUE CHECK (version >= 0),
            city_name TEXT,
            job_status TEXT NOT NULL DEFAULT 'queued'
                CHECK (job_status IN ('queued', 'processing', 'complete', 'error')),
            calculation_status TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
