//! Shared types for persistent-memory granularity detection.
//!
//! This crate provides the vocabulary used by the config and core crates:
//! - The store granularity classes and their ordering
//! - Provenance of a resolved granularity (forced vs detected)
//! - Error categories for grouping failures
//! - Output formats for the probe tool

pub mod error;
pub mod granularity;
pub mod output;

pub use error::ErrorCategory;
pub use granularity::{Granularity, Provenance};
pub use output::OutputFormat;

/// Schema version for JSON reports and settings files.
pub const SCHEMA_VERSION: &str = "1.0.0";
