//! HTTP API handlers

pub mod health;
pub mod indicators;
pub mod jobs;
pub mod sample_periods;
pub mod types;
pub mod upload;
pub mod version;

pub use health::health_routes;
pub use indicators::indicator_routes;
pub use jobs::job_routes;
pub use sample_periods::sample_period_routes;
pub use types::type_routes;
pub use upload::upload_routes;
pub use version::version_routes;
