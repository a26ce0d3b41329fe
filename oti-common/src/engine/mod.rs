//! Ingestion and versioning engine
//!
//! - `resolver`: sample period lookup, cached per load
//! - `store`: structured single/batch creates
//! - `loader`: atomic bulk load from delimited files
//! - `version`: current version query
//! - `jobs` / `dispatch`: job creation and hand-off to the worker

pub mod dispatch;
pub mod jobs;
pub mod loader;
pub mod resolver;
pub mod store;
pub mod version;

pub use dispatch::{JobCommand, JobDispatcher, QueueDispatcher};
pub use loader::{BulkLoader, LoadResult};
pub use resolver::SamplePeriodResolver;
pub use version::{current_version, VersionInfo};
