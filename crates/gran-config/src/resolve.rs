//! Settings and override resolution.
//!
//! Settings file resolution order: CLI argument → environment variables →
//! XDG config directory → /etc → built-in defaults.
//!
//! Override directive precedence: `--force-granularity` →
//! `PMEM2_FORCE_GRANULARITY` → `force_granularity` in the settings file.

use crate::error::ConfigError;
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable carrying the override directive.
pub const ENV_FORCE_GRANULARITY: &str = "PMEM2_FORCE_GRANULARITY";

/// Environment variable names for settings discovery.
const ENV_CONFIG_PATH: &str = "GRAN_DETECT_CONFIG";
const ENV_CONFIG_DIR: &str = "GRAN_DETECT_CONFIG_DIR";

/// Standard settings file name.
const CONFIG_FILENAME: &str = "config.json";

/// Application name for XDG and /etc directories.
const APP_NAME: &str = "gran-detect";

/// Where a settings file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/gran-detect/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Loaded settings with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub settings: Settings,
    /// Settings file used (None when running on defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Locate and load the settings file.
///
/// An explicit CLI path must exist. Paths discovered through the
/// environment or standard directories are skipped when absent.
pub fn load_settings(cli_path: Option<&Path>) -> Result<ResolvedSettings, ConfigError> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
    }

    let (path, source) = resolve_settings_path(cli_path);
    let settings = match &path {
        Some(p) => Settings::from_file(p)?,
        None => Settings::default(),
    };

    debug!(source = %source, path = ?path, "settings resolved");
    Ok(ResolvedSettings {
        settings,
        path,
        source,
    })
}

/// Resolve the settings file path.
fn resolve_settings_path(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.exists() {
            return (Some(path.to_path_buf()), ConfigSource::CliArgument);
        }
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    // 4. XDG config directory
    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    // 5. System config
    let system_path = PathBuf::from("/etc").join(APP_NAME).join(CONFIG_FILENAME);
    if system_path.exists() {
        return (Some(system_path), ConfigSource::SystemConfig);
    }

    (None, ConfigSource::BuiltinDefault)
}

/// Where the override directive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSource {
    CliArgument,
    Environment,
    SettingsFile,
}

impl std::fmt::Display for OverrideSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideSource::CliArgument => write!(f, "CLI argument"),
            OverrideSource::Environment => write!(f, "{}", ENV_FORCE_GRANULARITY),
            OverrideSource::SettingsFile => write!(f, "settings file"),
        }
    }
}

/// A raw, not yet parsed, override token and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideDirective {
    pub token: String,
    pub source: OverrideSource,
}

/// Pick the override directive by precedence.
///
/// Empty values count as unset at every level. The token is returned raw;
/// parsing happens in the resolver so a malformed token surfaces as a
/// resolution failure.
pub fn resolve_override(
    cli: Option<&str>,
    env: Option<&str>,
    settings: &Settings,
) -> Option<OverrideDirective> {
    let candidates = [
        (cli, OverrideSource::CliArgument),
        (env, OverrideSource::Environment),
        (settings.force_granularity.as_deref(), OverrideSource::SettingsFile),
    ];

    candidates
        .into_iter()
        .find_map(|(token, source)| match token {
            Some(t) if !t.is_empty() => Some(OverrideDirective {
                token: t.to_string(),
                source,
            }),
            _ => None,
        })
}
