//! Database models and queries

pub mod indicators;
pub mod init;
pub mod jobs;
pub mod models;
pub mod retry;
pub mod sample_periods;

pub use init::{init_database, DatabaseOptions};
pub use models::*;
pub use retry::retry_on_lock;
