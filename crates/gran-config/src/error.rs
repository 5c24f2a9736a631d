//! Configuration errors.

use crate::resolve::OverrideSource;
use gran_common::ErrorCategory;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing the override directive or loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unrecognized granularity {token:?} (expected byte, cache_line or page)")]
    UnrecognizedGranularity { token: String },

    #[error("unrecognized granularity {token:?} from {origin} (expected byte, cache_line or page)")]
    InvalidOverride {
        token: String,
        origin: OverrideSource,
    },

    #[error("settings file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("invalid JSON in settings file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("invalid setting {field}: {message}")]
    InvalidSetting { field: &'static str, message: String },
}

impl ConfigError {
    /// Every configuration error belongs to the config category.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Config
    }

    /// Tie an unparseable override token to the source it was taken from.
    pub fn attributed_to(self, source: OverrideSource) -> Self {
        match self {
            ConfigError::UnrecognizedGranularity { token } => {
                ConfigError::InvalidOverride { token, origin: source }
            }
            other => other,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            ConfigError::UnrecognizedGranularity { .. } => {
                "Use byte, cache_line or page."
            }
            ConfigError::InvalidOverride { origin, .. } => match origin {
                OverrideSource::CliArgument => {
                    "Pass byte, cache_line or page to --force-granularity, or drop the flag to detect."
                }
                OverrideSource::Environment => {
                    "Set PMEM2_FORCE_GRANULARITY to byte, cache_line or page, or unset it to detect."
                }
                OverrideSource::SettingsFile => {
                    "Set force_granularity in the settings file to byte, cache_line or page, or remove it to detect."
                }
            },
            ConfigError::NotFound { .. } => {
                "Check the --config path, or drop the flag to use the default settings."
            }
            ConfigError::ParseError { .. } => {
                "Fix the JSON syntax in the settings file or remove it to use defaults."
            }
            ConfigError::IoError { .. } => "Check permissions on the settings file.",
            ConfigError::VersionMismatch { .. } => {
                "Regenerate the settings file for this version of gran_detecto."
            }
            ConfigError::InvalidSetting { .. } => {
                "Correct the named field in the settings file."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unrecognized(token: &str) -> ConfigError {
        ConfigError::UnrecognizedGranularity {
            token: token.to_string(),
        }
    }

    #[test]
    fn test_attribution_names_the_source() {
        let err = unrecognized("huge").attributed_to(OverrideSource::SettingsFile);
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                origin: OverrideSource::SettingsFile,
                ..
            }
        ));
        assert!(err.to_string().contains("\"huge\" from settings file"));
        assert!(err.remediation().contains("force_granularity in the settings file"));
        assert!(!err.remediation().contains("PMEM2_FORCE_GRANULARITY"));
    }

    #[test]
    fn test_attribution_per_source_hint() {
        let env = unrecognized("x").attributed_to(OverrideSource::Environment);
        assert!(env.remediation().starts_with("Set PMEM2_FORCE_GRANULARITY"));

        let cli = unrecognized("x").attributed_to(OverrideSource::CliArgument);
        assert!(cli.remediation().contains("--force-granularity"));
    }

    #[test]
    fn test_attribution_leaves_other_errors() {
        let err = ConfigError::InvalidSetting {
            field: "probe.sys_root",
            message: "relative".to_string(),
        }
        .attributed_to(OverrideSource::Environment);
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }
}
