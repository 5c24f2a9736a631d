//! Event vocabulary for structured logging.
//!
//! Every record names a [`Stage`] and one of the [`event_names`]; the
//! correlation IDs come from a [`LogContext`] or an enclosing span.

use serde::{Deserialize, Serialize};

/// Stages of one gran_detecto invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, settings loading.
    Init,
    /// Override directive selection.
    Override,
    /// Capability probing.
    Probe,
    /// Mapping facts to a granularity.
    Classify,
    /// Report rendering and exit status.
    Report,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Override => "override",
            Stage::Probe => "probe",
            Stage::Classify => "classify",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event names; used as the tracing target of each record.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    pub const OVERRIDE_SELECTED: &str = "override.selected";
    pub const OVERRIDE_ABSENT: &str = "override.absent";

    pub const RESOLVE_FORCED: &str = "resolve.forced";
    pub const RESOLVE_DETECTED: &str = "resolve.detected";
    pub const RESOLVE_FAILED: &str = "resolve.failed";

    pub const REPORT_MISMATCH: &str = "report.mismatch";
    pub const REPORT_REQUIREMENT_FAILED: &str = "report.requirement_failed";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation IDs shared by every record of one run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }
}
