//! Exit codes for gran_detecto.
//!
//! Exit codes let test drivers assert on the outcome without parsing output.
//!
//! Exit code ranges:
//! - 0-1: Resolution completed (matched / did not match the expectation)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

/// Exit codes for gran_detecto.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Resolution outcomes (0-1)
    // ========================================================================
    /// Granularity resolved (and equal to the expectation, if one was given)
    Clean = 0,

    /// Granularity resolved but differs from the expectation
    Mismatch = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Unrecognized override directive or invalid settings file
    ConfigError = 11,

    /// Target path cannot be opened or inspected
    InaccessibleError = 12,

    /// Backing medium cannot be classified
    UnsupportedMediumError = 13,

    /// Resolved granularity is coarser than `--require`
    GranularityNotSupported = 14,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean)
    }

    /// Check if this exit code is a resolution outcome rather than an error.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        let code = self as i32;
        (10..20).contains(&code)
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        let code = self as i32;
        code >= 20
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Mismatch => "ERR_MISMATCH",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InaccessibleError => "ERR_INACCESSIBLE",
            ExitCode::UnsupportedMediumError => "ERR_UNSUPPORTED_MEDIUM",
            ExitCode::GranularityNotSupported => "ERR_GRANULARITY_NOT_SUPPORTED",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
