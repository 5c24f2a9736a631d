//! Persistent-memory store granularity detection.
//!
//! This library provides:
//! - Capability probing of files, directories and devices
//! - Granularity resolution with the `PMEM2_FORCE_GRANULARITY` override
//! - Probe and error reports for the `gran_detecto` tool
//! - Exit codes and structured logging
//!
//! The binary entry point is in `main.rs`.

pub mod exit_codes;
pub mod logging;
pub mod probe;
pub mod report;
pub mod resolver;

pub use probe::{CapabilityFacts, CapabilityProber, ProbeError, SystemProber};
pub use resolver::{classify, require, resolve, MediumClass, ResolutionError, ResolutionResult, Resolver};
