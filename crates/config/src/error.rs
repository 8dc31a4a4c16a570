//! Error types for configuration resolution.
//!
//! Responsibilities:
//! - Define error variants for source construction, format dispatch, merging,
//!   and backend composition failures.
//! - Carry enough context (source name/order, merge key paths, file paths) to
//!   diagnose a failure without a debugger.
//!
//! Does NOT handle:
//! - Conditional-activation failures as hard errors: `enable_if` evaluation
//!   errors are reported through `InvalidContext` but callers downgrade them
//!   to "source disabled" (see source.rs).
//!
//! Invariants:
//! - Merge errors always include the dotted key path from the merge root.
//! - Per-source load failures are wrapped in `Source` with the member's
//!   name and order before crossing the source-list boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while constructing sources or resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ambiguous order {order} for config source {name}")]
    AmbiguousOrder { order: i64, name: String },

    #[error("config source at index {index} has no order assigned")]
    MissingOrder { index: usize },

    #[error("invalid config source: {0}")]
    InvalidSource(String),

    #[error("no format found for {what}")]
    FormatNotFound { what: String },

    #[error("{0} is not supported")]
    NotSupported(String),

    #[error("invalid merge key {key:?} at {path}")]
    InvalidMergeKey { key: String, path: String },

    #[error("index {index} out of range for sequence of length {len} at {path}")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        path: String,
    },

    #[error("invalid context expression: {0}")]
    InvalidContext(String),

    #[error("composed config failed validation: {0}")]
    Validation(String),

    /// Wraps a failure with the identity of the source-list member it came from.
    #[error("config source {name} (order {order}) failed to load")]
    Source {
        name: String,
        order: i64,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("IO error for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Wrap an error with the name and order of the source it belongs to.
    pub(crate) fn for_source(self, name: String, order: i64) -> Self {
        ConfigError::Source {
            name,
            order,
            source: Box::new(self),
        }
    }
}
