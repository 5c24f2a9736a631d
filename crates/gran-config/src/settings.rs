//! Typed settings file.
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "force_granularity": null,
//!   "probe": { "proc_root": "/proc", "sys_root": "/sys", "map_probe": true }
//! }
//! ```
//!
//! Every field is optional; missing fields take the built-in defaults.

use crate::error::ConfigError;
use gran_common::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Detector settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Settings schema version.
    pub schema_version: String,

    /// Override directive used when neither the CLI nor the environment
    /// supplies one.
    pub force_granularity: Option<String>,

    /// Capability prober settings.
    pub probe: ProbeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            schema_version: SCHEMA_VERSION.to_string(),
            force_granularity: None,
            probe: ProbeSettings::default(),
        }
    }
}

/// Where the prober looks for kernel-provided metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// procfs mount point (mountinfo lives under `<proc_root>/self`).
    pub proc_root: PathBuf,

    /// sysfs mount point (device and NVDIMM region metadata).
    pub sys_root: PathBuf,

    /// Attempt a transient MAP_SYNC mapping of regular files.
    pub map_probe: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        ProbeSettings {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
            map_probe: true,
        }
    }
}

impl Settings {
    /// Load and validate settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::IoError {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let settings: Settings =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Semantic validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let expected_major = SCHEMA_VERSION.split('.').next().unwrap_or_default();
        let actual_major = self.schema_version.split('.').next().unwrap_or_default();
        if expected_major != actual_major {
            return Err(ConfigError::VersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        // force_granularity is parsed only if it wins override precedence.

        if !self.probe.proc_root.is_absolute() {
            return Err(ConfigError::InvalidSetting {
                field: "probe.proc_root",
                message: format!("{} is not an absolute path", self.probe.proc_root.display()),
            });
        }
        if !self.probe.sys_root.is_absolute() {
            return Err(ConfigError::InvalidSetting {
                field: "probe.sys_root",
                message: format!("{} is not an absolute path", self.probe.sys_root.display()),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_settings(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.schema_version, SCHEMA_VERSION);
        assert!(settings.force_granularity.is_none());
        assert_eq!(settings.probe.proc_root, PathBuf::from("/proc"));
        assert_eq!(settings.probe.sys_root, PathBuf::from("/sys"));
        assert!(settings.probe.map_probe);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = write_settings(r#"{"probe": {"map_probe": false}}"#);
        let settings = Settings::from_file(file.path()).unwrap();
        assert!(!settings.probe.map_probe);
        assert_eq!(settings.probe.sys_root, PathBuf::from("/sys"));
        assert_eq!(settings.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_force_granularity_kept_raw_on_load() {
        let file = write_settings(r#"{"force_granularity": "huge_page"}"#);
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.force_granularity.as_deref(), Some("huge_page"));
    }

    #[test]
    fn test_version_mismatch() {
        let file = write_settings(r#"{"schema_version": "2.0.0"}"#);
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::VersionMismatch { .. }));
    }

    #[test]
    fn test_minor_version_bump_accepted() {
        let file = write_settings(r#"{"schema_version": "1.4.0"}"#);
        assert!(Settings::from_file(file.path()).is_ok());
    }

    #[test]
    fn test_relative_root_rejected() {
        let file = write_settings(r#"{"probe": {"sys_root": "sys"}}"#);
        let err = Settings::from_file(file.path()).unwrap_err();
        match err {
            ConfigError::InvalidSetting { field, .. } => assert_eq!(field, "probe.sys_root"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_json() {
        let file = write_settings("{ not json");
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
