//! Probe reports and error reports for gran_detecto.
//!
//! Reports go to stdout; error reports in JSON mode go to stdout as well so
//! a driver parsing JSON always gets one object per run.

use crate::exit_codes::ExitCode;
use crate::probe::CapabilityFacts;
use crate::resolver::{MediumClass, ResolutionError, ResolutionResult};
use gran_common::{ErrorCategory, Granularity, OutputFormat, Provenance, SCHEMA_VERSION};
use gran_config::OverrideSource;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Result of one gran_detecto run.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub schema_version: String,
    pub generated_at: String,
    pub path: PathBuf,
    pub granularity: Granularity,
    pub provenance: Provenance,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_source: Option<String>,

    /// Expectation from `-p`/`-c`/`-b`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Granularity>,

    /// Whether the resolved granularity equals the expectation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<MediumClass>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<CapabilityFacts>,
}

impl ProbeReport {
    pub fn new(path: &Path, result: ResolutionResult) -> Self {
        ProbeReport {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            path: path.to_path_buf(),
            granularity: result.granularity,
            provenance: result.provenance,
            override_source: None,
            expected: None,
            matched: None,
            medium: result.medium,
            facts: result.facts,
        }
    }

    /// Record where a forcing directive came from.
    pub fn with_override_source(mut self, source: Option<OverrideSource>) -> Self {
        self.override_source = source.map(|s| s.to_string());
        self
    }

    /// Compare against an expected granularity.
    pub fn with_expectation(mut self, expected: Option<Granularity>) -> Self {
        self.expected = expected;
        self.matched = expected.map(|e| e == self.granularity);
        self
    }

    /// Exit code for a completed resolution.
    pub fn exit_code(&self) -> ExitCode {
        match self.matched {
            Some(false) => ExitCode::Mismatch,
            _ => ExitCode::Clean,
        }
    }

    /// Render for stdout. `Exitcode` renders nothing.
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Summary => Ok(self.summary()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
            OutputFormat::Exitcode => Ok(String::new()),
        }
    }

    fn summary(&self) -> String {
        let mut detail = self.provenance.to_string();
        if let Some(source) = &self.override_source {
            detail.push_str(&format!(" via {}", source));
        }
        if let Some(medium) = self.medium {
            detail.push_str(&format!(", {}", medium));
        }

        let mut line = format!("{}: {} ({})", self.path.display(), self.granularity, detail);
        if let (Some(expected), Some(matched)) = (self.expected, self.matched) {
            let verdict = if matched { "match" } else { "MISMATCH" };
            line.push_str(&format!(" expected {}: {}", expected, verdict));
        }
        line
    }
}

/// Structured error object.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: i32,
    pub code_name: &'static str,
    pub category: ErrorCategory,
    pub message: String,
    pub remediation: String,
}

impl ErrorReport {
    pub fn from_resolution(err: &ResolutionError) -> Self {
        let code = err.exit_code();
        ErrorReport {
            code: code.as_i32(),
            code_name: code.code_name(),
            category: err.category(),
            message: err.to_string(),
            remediation: err.remediation().to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let code = ExitCode::InternalError;
        ErrorReport {
            code: code.as_i32(),
            code_name: code.code_name(),
            category: ErrorCategory::Internal,
            message: message.into(),
            remediation: "This is a bug; please report it with the command line used.".to_string(),
        }
    }

    /// JSON object for machine consumers.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&serde_json::json!({ "error": self }))
            .unwrap_or_else(|_| format!(r#"{{"error":{{"code":{}}}}}"#, self.code))
    }

    /// Two-line text for stderr.
    pub fn to_text(&self) -> String {
        format!("gran_detecto: {}\nhint: {}", self.message, self.remediation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gran_config::ConfigError;

    fn forced(granularity: Granularity) -> ResolutionResult {
        ResolutionResult {
            granularity,
            provenance: Provenance::Forced,
            medium: None,
            facts: None,
        }
    }

    #[test]
    fn test_summary_forced() {
        let report = ProbeReport::new(Path::new("/mnt/pmem0"), forced(Granularity::Page))
            .with_override_source(Some(OverrideSource::Environment));
        assert_eq!(
            report.render(OutputFormat::Summary).unwrap(),
            "/mnt/pmem0: page (forced via PMEM2_FORCE_GRANULARITY)"
        );
        assert_eq!(report.exit_code(), ExitCode::Clean);
    }

    #[test]
    fn test_summary_detected_with_expectation() {
        let result = ResolutionResult {
            granularity: Granularity::Page,
            provenance: Provenance::Detected,
            medium: Some(MediumClass::BlockStorage),
            facts: None,
        };
        let report =
            ProbeReport::new(Path::new("/data"), result).with_expectation(Some(Granularity::CacheLine));
        assert_eq!(
            report.render(OutputFormat::Summary).unwrap(),
            "/data: page (detected, block_storage) expected cache_line: MISMATCH"
        );
        assert_eq!(report.matched, Some(false));
        assert_eq!(report.exit_code(), ExitCode::Mismatch);
    }

    #[test]
    fn test_expectation_met() {
        let report = ProbeReport::new(Path::new("/x"), forced(Granularity::Byte))
            .with_expectation(Some(Granularity::Byte));
        assert_eq!(report.matched, Some(true));
        assert_eq!(report.exit_code(), ExitCode::Clean);
    }

    #[test]
    fn test_json_report_fields() {
        let report = ProbeReport::new(Path::new("/x"), forced(Granularity::CacheLine))
            .with_override_source(Some(OverrideSource::CliArgument));
        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["granularity"], "cache_line");
        assert_eq!(json["provenance"], "forced");
        assert_eq!(json["override_source"], "CLI argument");
        assert!(json.get("expected").is_none());
        assert!(json.get("facts").is_none());
    }

    #[test]
    fn test_exitcode_format_is_silent() {
        let report = ProbeReport::new(Path::new("/x"), forced(Granularity::Page));
        assert!(report.render(OutputFormat::Exitcode).unwrap().is_empty());
    }

    #[test]
    fn test_error_report_from_config_error() {
        let err = ResolutionError::from(ConfigError::UnrecognizedGranularity {
            token: "pgae".to_string(),
        });
        let report = ErrorReport::from_resolution(&err);
        assert_eq!(report.code, 11);
        assert_eq!(report.code_name, "ERR_CONFIG");
        assert_eq!(report.category, ErrorCategory::Config);
        assert!(report.message.contains("pgae"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(json["error"]["code"], 11);
        assert_eq!(json["error"]["category"], "config");
    }

    #[test]
    fn test_error_report_internal() {
        let report = ErrorReport::internal("serialization failed");
        assert_eq!(report.code, 20);
        assert_eq!(report.code_name, "ERR_INTERNAL");
        assert!(report.to_text().starts_with("gran_detecto: serialization failed"));
    }
}
