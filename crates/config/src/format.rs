//! Format identification and IO dispatch.
//!
//! Responsibilities:
//! - Keep an ordered registry of named formats with identify/sniff/read/
//!   write entry points.
//! - Resolve the format of a file path or in-memory payload in two passes:
//!   cheap identification first, content sniffing second.
//! - Provide the built-in formats: `yaml`, `env`, `map`, `args`.
//!
//! Does NOT handle:
//! - Nested source lists: their payload shape is recognized during source
//!   construction and loads without the registry (see source.rs).
//!
//! Invariants:
//! - Specs are consulted in registration order; the first match wins.
//! - The process-wide default registry is immutable once accessed; custom
//!   seeding must happen before first use.
//! - YAML writes are atomic (temp file in the target directory + rename).
//! - Env parse failures never carry raw line contents, so values from an
//!   env file cannot leak through error messages.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};
use crate::flat;

/// Built-in format names.
pub const FORMAT_YAML: &str = "yaml";
pub const FORMAT_ENV: &str = "env";
pub const FORMAT_MAP: &str = "map";
pub const FORMAT_ARGS: &str = "args";

/// Reserved tag for nested source-list payloads. Never registered; loading
/// a nested source recurses into its list instead of dispatching here.
pub const FORMAT_SOURCES: &str = "sources";

/// Input handed to format entry points.
#[derive(Debug, Clone, Copy)]
pub enum FormatInput<'a> {
    File(&'a Path),
    Value(&'a Value),
}

/// A named format with plain-function entry points.
///
/// `identify` must be cheap (extension or payload shape checks only);
/// `sniff` may open the file and is consulted only when no format
/// identified the input. Formats without a writer reject `dump`.
#[derive(Debug, Clone, Copy)]
pub struct FormatSpec {
    pub name: &'static str,
    pub identify: fn(&FormatInput<'_>) -> bool,
    pub sniff: Option<fn(&Path) -> bool>,
    pub read: fn(&FormatInput<'_>) -> Result<Mapping>,
    pub write: Option<fn(&Mapping, &Path) -> Result<()>>,
}

/// An ordered collection of format specs.
#[derive(Debug, Default)]
pub struct FormatRegistry {
    specs: Vec<FormatSpec>,
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        FormatRegistry { specs: Vec::new() }
    }

    /// A registry holding the built-in formats.
    pub fn with_builtins() -> Self {
        FormatRegistry {
            specs: vec![yaml_spec(), env_spec(), map_spec(), args_spec()],
        }
    }

    /// Register a format. Names must be unique within the registry.
    pub fn register(&mut self, spec: FormatSpec) -> Result<()> {
        if self.contains(spec.name) {
            return Err(ConfigError::InvalidSource(format!(
                "format {:?} is already registered",
                spec.name
            )));
        }
        self.specs.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FormatSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolve the format of an input, or None if nothing claims it.
    ///
    /// Every spec's cheap `identify` runs first in registration order;
    /// only if none matched does each spec's content `sniff` get a chance
    /// to open a file input.
    pub fn identify(&self, input: &FormatInput<'_>) -> Option<&'static str> {
        for spec in &self.specs {
            if (spec.identify)(input) {
                return Some(spec.name);
            }
        }
        if let FormatInput::File(path) = input {
            for spec in &self.specs {
                if let Some(sniff) = spec.sniff
                    && sniff(path)
                {
                    return Some(spec.name);
                }
            }
        }
        None
    }

    /// Read a mapping through the named format.
    pub fn read(&self, name: &str, input: &FormatInput<'_>) -> Result<Mapping> {
        let spec = self.get(name).ok_or_else(|| ConfigError::FormatNotFound {
            what: format!("format {name:?}"),
        })?;
        (spec.read)(input)
    }

    /// Write a mapping through the named format.
    pub fn write(&self, name: &str, data: &Mapping, path: &Path) -> Result<()> {
        let spec = self.get(name).ok_or_else(|| ConfigError::FormatNotFound {
            what: format!("format {name:?}"),
        })?;
        let Some(write) = spec.write else {
            return Err(ConfigError::NotSupported(format!("writing format {name:?}")));
        };
        write(data, path)
    }
}

static DEFAULT_REGISTRY: OnceLock<FormatRegistry> = OnceLock::new();

/// The process-wide registry, created with the built-in formats on first
/// access.
pub fn default_registry() -> &'static FormatRegistry {
    DEFAULT_REGISTRY.get_or_init(FormatRegistry::with_builtins)
}

/// Install a custom registry as the process-wide default.
///
/// Fails once the default has been accessed or seeded; call it before any
/// source construction.
pub fn seed_default_registry(registry: FormatRegistry) -> Result<()> {
    DEFAULT_REGISTRY.set(registry).map_err(|_| {
        ConfigError::InvalidSource("default format registry is already initialized".to_string())
    })
}

fn yaml_spec() -> FormatSpec {
    FormatSpec {
        name: FORMAT_YAML,
        identify: identify_yaml,
        sniff: None,
        read: read_yaml,
        write: Some(write_yaml),
    }
}

fn identify_yaml(input: &FormatInput<'_>) -> bool {
    match input {
        FormatInput::File(path) => matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        ),
        FormatInput::Value(_) => false,
    }
}

fn read_yaml(input: &FormatInput<'_>) -> Result<Mapping> {
    let FormatInput::File(path) = input else {
        return Err(ConfigError::InvalidSource(
            "yaml format reads files".to_string(),
        ));
    };
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: Value = serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    match value {
        Value::Mapping(map) => Ok(map),
        // an empty document reads as an empty config
        Value::Null => Ok(Mapping::new()),
        _ => Err(ConfigError::InvalidSource(format!(
            "{}: top-level YAML document must be a mapping",
            path.display()
        ))),
    }
}

fn write_yaml(data: &Mapping, path: &Path) -> Result<()> {
    let text = serde_yaml::to_string(data)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, text).map_err(|e| ConfigError::Io {
        path: temp_path.clone(),
        source: e,
    })?;
    fs::rename(&temp_path, path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn env_spec() -> FormatSpec {
    FormatSpec {
        name: FORMAT_ENV,
        identify: identify_env,
        sniff: Some(sniff_env),
        read: read_env,
        write: None,
    }
}

fn identify_env(input: &FormatInput<'_>) -> bool {
    match input {
        FormatInput::File(path) => path.extension().and_then(|ext| ext.to_str()) == Some("env"),
        FormatInput::Value(_) => false,
    }
}

fn sniff_env(path: &Path) -> bool {
    match dotenvy::from_path_iter(path) {
        Ok(mut iter) => iter.all(|item| item.is_ok()),
        Err(_) => false,
    }
}

fn read_env(input: &FormatInput<'_>) -> Result<Mapping> {
    let FormatInput::File(path) = input else {
        return Err(ConfigError::InvalidSource(
            "env format reads files".to_string(),
        ));
    };
    let iter = dotenvy::from_path_iter(path).map_err(|e| env_error(path, e))?;
    let mut map = Mapping::new();
    for item in iter {
        let (key, value) = item.map_err(|e| env_error(path, e))?;
        map.insert(Value::String(key), Value::String(value));
    }
    Ok(map)
}

fn env_error(path: &Path, error: dotenvy::Error) -> ConfigError {
    match error {
        dotenvy::Error::Io(e) => ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        },
        // parse failures report position only, never the line contents
        dotenvy::Error::LineParse(_, index) => ConfigError::InvalidSource(format!(
            "{}: invalid env line at position {index}",
            path.display()
        )),
        _ => ConfigError::InvalidSource(format!("{}: invalid env file", path.display())),
    }
}

fn map_spec() -> FormatSpec {
    FormatSpec {
        name: FORMAT_MAP,
        identify: identify_map,
        sniff: None,
        read: read_map,
        write: None,
    }
}

fn identify_map(input: &FormatInput<'_>) -> bool {
    match input {
        FormatInput::Value(Value::Mapping(map)) => map.iter().all(|(key, _)| match key {
            Value::String(_) => true,
            Value::Number(n) => n.is_i64() || n.is_u64(),
            _ => false,
        }),
        _ => false,
    }
}

fn read_map(input: &FormatInput<'_>) -> Result<Mapping> {
    let FormatInput::Value(Value::Mapping(map)) = input else {
        return Err(ConfigError::InvalidSource(
            "map format reads in-memory mappings".to_string(),
        ));
    };
    flat::nested_from_flat(map.clone())
}

fn args_spec() -> FormatSpec {
    FormatSpec {
        name: FORMAT_ARGS,
        identify: identify_args,
        sniff: None,
        read: read_args,
        write: None,
    }
}

fn identify_args(input: &FormatInput<'_>) -> bool {
    match input {
        FormatInput::Value(Value::Sequence(items)) => {
            items.iter().all(|item| matches!(item, Value::String(_)))
        }
        _ => false,
    }
}

fn read_args(input: &FormatInput<'_>) -> Result<Mapping> {
    let FormatInput::Value(Value::Sequence(items)) = input else {
        return Err(ConfigError::InvalidSource(
            "args format reads string sequences".to_string(),
        ));
    };
    let mut tokens = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item {
            Value::String(s) => tokens.push(s.clone()),
            other => {
                return Err(ConfigError::InvalidSource(format!(
                    "args sources hold strings, found {other:?}"
                )));
            }
        }
    }
    flat::mapping_from_cli_args(&tokens)
}
