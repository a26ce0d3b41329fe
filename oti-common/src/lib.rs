//! # OTI Common Library
//!
//! Shared code for the transit indicator services:
//! - Error and result types
//! - Configuration loading
//! - Database schema, models and queries
//! - The ingestion engine (bulk load, structured create, versioning, job dispatch)

pub mod config;
pub mod db;
pub mod engine;
pub mod error;

pub use error::{Error, FieldError, Result};
