//! Layered configuration resolution.
//!
//! This crate builds runtime configuration by merging an ordered list of
//! sources (files, inline mappings, CLI tokens, nested lists) under four
//! precedence layers, with provenance attached to every composed result.

pub mod backend;
pub mod error;
pub mod expr;
pub mod flat;
pub mod format;
pub mod info;
pub mod merge;
pub mod source;
mod value;

pub use backend::{ConfigBackend, RuntimeContext};
pub use error::{ConfigError, Result};
pub use expr::Predicate;
pub use flat::{flat_from_nested, mapping_from_cli_args, nested_from_flat};
pub use format::{
    FORMAT_ARGS, FORMAT_ENV, FORMAT_MAP, FORMAT_SOURCES, FORMAT_YAML, FormatInput, FormatRegistry,
    FormatSpec, default_registry, seed_default_registry,
};
pub use info::{ConfigSnapshot, RuntimeConfig, RuntimeInfo, SystemInfo};
pub use merge::{merge_into, merge_mappings};
pub use source::{ConfigSource, ConfigSourceList, OrderMode, SourcePayload, SourceSpec};
pub use value::parse_yaml_literal;
