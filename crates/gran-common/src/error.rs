//! Error categories shared across crates.
//!
//! Each concrete error type (config, probe, resolution) maps itself onto one
//! of these categories so that reports and logs can group failures without
//! knowing every variant.

use serde::{Deserialize, Serialize};

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Override directive or settings file errors.
    Config,
    /// Target path could not be opened or inspected.
    Access,
    /// Backing medium could not be classified.
    Medium,
    /// Resolved granularity does not meet a requirement.
    Requirement,
    /// Bugs and serialization failures.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Access => write!(f, "access"),
            ErrorCategory::Medium => write!(f, "medium"),
            ErrorCategory::Requirement => write!(f, "requirement"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}
