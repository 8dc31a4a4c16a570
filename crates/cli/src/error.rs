//! CLI exit codes for scripting and automation.
//!
//! Responsibilities:
//! - Define structured exit codes that scripts can use to distinguish
//!   failure categories.
//! - Map `ConfigError` variants to appropriate exit codes.
//!
//! Does NOT handle:
//! - Error message formatting (handled by anyhow Display).
//!
//! Invariants:
//! - Exit codes 1-5 are reserved for specific error categories.
//! - Usage errors exit with 2, matching what clap uses for bad arguments.

use strata_config::ConfigError;

/// A malformed command-line value, e.g. a `--set` entry without `=`.
///
/// Kept separate from `ConfigError` so argument problems map to the usage
/// exit code instead of the general one.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Structured exit codes for strata.
///
/// These codes let scripts distinguish between failure modes and decide
/// whether to fix their input, their files, or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success - command completed successfully.
    Success = 0,

    /// General error - unhandled or generic failure.
    GeneralError = 1,

    /// Invalid input - bad arguments, malformed source declarations, or a
    /// composition that failed validation.
    ///
    /// Scripts should fix the invocation or the declarations, not retry.
    InvalidSources = 2,

    /// Unresolved format - no registered format claimed a source.
    ///
    /// Scripts should pass an explicit format or rename the file.
    UnresolvedFormat = 3,

    /// Merge conflict - a list-update key was malformed or out of range.
    ///
    /// Scripts should fix the offending key path reported in the message.
    MergeConflict = 4,

    /// IO error - a source file could not be read, parsed, or written.
    IoError = 5,
}

impl ExitCode {
    /// Convert the exit code to an i32 for use with std::process::exit().
    pub const fn as_i32(self) -> i32 {
        self as u8 as i32
    }
}

impl From<&ConfigError> for ExitCode {
    /// Map `ConfigError` variants to structured exit codes.
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::AmbiguousOrder { .. }
            | ConfigError::MissingOrder { .. }
            | ConfigError::InvalidSource(_)
            | ConfigError::InvalidContext(_)
            | ConfigError::Validation(_)
            | ConfigError::NotSupported(_) => ExitCode::InvalidSources,

            ConfigError::FormatNotFound { .. } => ExitCode::UnresolvedFormat,

            ConfigError::InvalidMergeKey { .. } | ConfigError::IndexOutOfRange { .. } => {
                ExitCode::MergeConflict
            }

            ConfigError::Io { .. } | ConfigError::Parse { .. } => ExitCode::IoError,

            // report the code of the underlying failure, not the wrapper
            ConfigError::Source { source, .. } => Self::from(source.as_ref()),

            ConfigError::Yaml(_) => ExitCode::GeneralError,
        }
    }
}

/// Extension trait for anyhow::Error to extract exit codes.
pub trait ExitCodeExt {
    /// Extract the appropriate exit code from this error.
    ///
    /// Returns ExitCode::GeneralError if no known error type is found in
    /// the chain.
    fn exit_code(&self) -> ExitCode;
}

impl ExitCodeExt for anyhow::Error {
    fn exit_code(&self) -> ExitCode {
        for cause in self.chain() {
            if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
                return ExitCode::from(config_err);
            }
            if cause.downcast_ref::<UsageError>().is_some() {
                return ExitCode::InvalidSources;
            }
        }
        ExitCode::GeneralError
    }
}
