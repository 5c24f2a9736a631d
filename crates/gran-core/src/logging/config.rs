//! Logging configuration.
//!
//! The level comes from `-v`/`-q`, then `GRAN_LOG`, then `RUST_LOG`; the
//! format from `--log-format`, then `GRAN_LOG_FORMAT`.

use clap::ValueEnum;
use tracing_subscriber::filter::LevelFilter;

/// Environment variable selecting the log level.
pub const ENV_LOG_LEVEL: &str = "GRAN_LOG";

/// Environment variable selecting the log format.
pub const ENV_LOG_FORMAT: &str = "GRAN_LOG_FORMAT";

/// Warnings only, so a clean run leaves stderr empty.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::WARN;

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable console format.
    #[default]
    Human,
    /// One JSON object per line.
    #[value(alias = "json")]
    Jsonl,
}

/// Level selected by `-v` repetitions and `-q`; `-q` wins.
pub fn level_from_verbosity(verbose: u8, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        return Some(LevelFilter::ERROR);
    }
    match verbose {
        0 => None,
        1 => Some(LevelFilter::INFO),
        2 => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: DEFAULT_LEVEL,
        }
    }
}

impl LogConfig {
    /// Combine CLI choices with the environment.
    pub fn from_env(cli_level: Option<LevelFilter>, cli_format: Option<LogFormat>) -> Self {
        Self::from_values(
            cli_level,
            cli_format,
            std::env::var(ENV_LOG_LEVEL).ok().as_deref(),
            std::env::var("RUST_LOG").ok().as_deref(),
            std::env::var(ENV_LOG_FORMAT).ok().as_deref(),
        )
    }

    fn from_values(
        cli_level: Option<LevelFilter>,
        cli_format: Option<LogFormat>,
        gran_log: Option<&str>,
        rust_log: Option<&str>,
        log_format: Option<&str>,
    ) -> Self {
        // GRAN_LOG shadows RUST_LOG even when it does not parse.
        let env_level = match gran_log {
            Some(val) => val.trim().parse::<LevelFilter>().ok(),
            None => rust_log.and_then(level_from_rust_log),
        };
        let env_format = log_format.and_then(|val| LogFormat::from_str(val.trim(), true).ok());

        LogConfig {
            format: cli_format.or(env_format).unwrap_or_default(),
            level: cli_level.or(env_level).unwrap_or(DEFAULT_LEVEL),
        }
    }
}

/// Most verbose level named anywhere in a RUST_LOG directive.
fn level_from_rust_log(val: &str) -> Option<LevelFilter> {
    [
        ("trace", LevelFilter::TRACE),
        ("debug", LevelFilter::DEBUG),
        ("info", LevelFilter::INFO),
        ("warn", LevelFilter::WARN),
        ("error", LevelFilter::ERROR),
    ]
    .into_iter()
    .find(|(name, _)| val.contains(name))
    .map(|(_, level)| level)
}
