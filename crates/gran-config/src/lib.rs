//! Configuration for persistent-memory granularity detection.
//!
//! This crate provides:
//! - The override directive parser (`PMEM2_FORCE_GRANULARITY` tokens)
//! - Typed settings loaded from a JSON settings file
//! - Settings and override resolution (CLI → env → XDG → /etc → defaults)

pub mod directive;
pub mod error;
pub mod resolve;
pub mod settings;

pub use directive::{normalize_token, parse_directive, parse_granularity};
pub use error::ConfigError;
pub use resolve::{
    load_settings, resolve_override, ConfigSource, OverrideDirective, OverrideSource,
    ResolvedSettings, ENV_FORCE_GRANULARITY,
};
pub use settings::{ProbeSettings, Settings};
