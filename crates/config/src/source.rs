//! Config sources and ordered source lists.
//!
//! Responsibilities:
//! - Normalize raw payload declarations (path string, inline mapping, CLI
//!   token list, nested spec list) into typed sources.
//! - Resolve each source's format against the default registry.
//! - Gate loading on the `enabled` flag and the `enable_if` predicate.
//! - Merge enabled sources in ascending order into one mapping.
//!
//! Does NOT handle:
//! - Layer composition and caching (see backend.rs).
//! - Format IO itself (see format.rs).
//!
//! Invariants:
//! - Orders are unique within a list and the list stays sorted ascending.
//! - File payloads are expanded, canonicalized, and verified to exist at
//!   construction, not at first load.
//! - A source with `enable_if` but no context to evaluate it against stays
//!   disabled, as does one whose predicate fails to parse or evaluate.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};
use crate::expr::Predicate;
use crate::format::{FORMAT_SOURCES, FormatInput, default_registry};
use crate::merge;

/// Declarative description of one config source, as found in a source-list
/// item or built in code through the `with_*` helpers.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    #[serde(default)]
    pub order: Option<i64>,
    pub source: Value,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub enable_if: Option<String>,
}

fn default_true() -> bool {
    true
}

impl SourceSpec {
    pub fn new(source: Value) -> Self {
        SourceSpec {
            order: None,
            source,
            format: None,
            name: None,
            enabled: true,
            enable_if: None,
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_enable_if(mut self, predicate: impl Into<String>) -> Self {
        self.enable_if = Some(predicate.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Where a source's data lives once the raw declaration is normalized.
#[derive(Debug, Clone)]
pub enum SourcePayload {
    /// Canonicalized path to an existing file.
    File(PathBuf),
    /// In-memory payload (a mapping or a CLI token sequence).
    Value(Value),
    /// An inline list of further sources, merged as a unit.
    Nested(ConfigSourceList),
}

/// One config source with a resolved payload, format, and order.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    order: i64,
    payload: SourcePayload,
    format: String,
    name: Option<String>,
    enabled: bool,
    enable_if: Option<String>,
}

impl ConfigSource {
    /// Build a source from its spec and a resolved order.
    pub fn new(spec: SourceSpec, order: i64) -> Result<Self> {
        let SourceSpec {
            source,
            format,
            name,
            enabled,
            enable_if,
            ..
        } = spec;
        let payload = resolve_payload(source)?;
        let format = resolve_format(&payload, format)?;
        let name = resolve_name(name, &payload);
        Ok(ConfigSource {
            order,
            payload,
            format,
            name,
            enabled,
            enable_if,
        })
    }

    pub fn order(&self) -> i64 {
        self.order
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn payload(&self) -> &SourcePayload {
        &self.payload
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable_if(&self) -> Option<&str> {
        self.enable_if.as_deref()
    }

    /// Whether this source participates in a load under the given context.
    ///
    /// The `enabled` flag wins outright. An `enable_if` predicate needs a
    /// context and a clean boolean evaluation; anything else disables the
    /// source rather than failing the load.
    pub fn is_enabled_for(&self, context: Option<&Mapping>) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(predicate) = self.enable_if.as_deref() else {
            return true;
        };
        let Some(context) = context else {
            tracing::debug!(
                source = %self.display_name(),
                "No context provided, conditional source stays disabled"
            );
            return false;
        };
        match Predicate::parse(predicate).and_then(|p| p.eval(context)) {
            Ok(enabled) => enabled,
            Err(error) => {
                tracing::debug!(
                    source = %self.display_name(),
                    %error,
                    "Predicate evaluation failed, source stays disabled"
                );
                false
            }
        }
    }

    /// Read this source's data as a nested mapping.
    pub fn load(&self, context: Option<&Mapping>) -> Result<Mapping> {
        match &self.payload {
            SourcePayload::Nested(list) => list.load(context),
            SourcePayload::File(path) => {
                default_registry().read(&self.format, &FormatInput::File(path))
            }
            SourcePayload::Value(value) => {
                default_registry().read(&self.format, &FormatInput::Value(value))
            }
        }
    }

    /// Replace this source's data wholesale.
    ///
    /// File payloads go through the format's writer; in-memory and nested
    /// payloads are swapped for the new mapping and the format is
    /// re-identified.
    pub fn dump(&mut self, data: Mapping) -> Result<()> {
        if let SourcePayload::File(path) = &self.payload {
            return default_registry().write(&self.format, &data, path);
        }
        let slot = Value::Mapping(data);
        // a failed identify must leave the source untouched
        self.format = default_registry()
            .identify(&FormatInput::Value(&slot))
            .ok_or_else(|| ConfigError::FormatNotFound {
                what: "format of in-memory payload".to_string(),
            })?
            .to_string();
        self.payload = SourcePayload::Value(slot);
        Ok(())
    }

    /// Plain-data description of this source for runtime info and display.
    pub fn describe(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(Value::from("order"), Value::from(self.order));
        map.insert(
            Value::from("source"),
            match &self.payload {
                SourcePayload::File(path) => Value::String(path.display().to_string()),
                SourcePayload::Value(value) => value.clone(),
                SourcePayload::Nested(list) => list.describe(),
            },
        );
        map.insert(Value::from("format"), Value::String(self.format.clone()));
        map.insert(
            Value::from("name"),
            match &self.name {
                Some(name) => Value::String(name.clone()),
                None => Value::Null,
            },
        );
        map.insert(Value::from("enabled"), Value::Bool(self.enabled));
        if let Some(predicate) = &self.enable_if {
            map.insert(Value::from("enable_if"), Value::String(predicate.clone()));
        }
        Value::Mapping(map)
    }

    pub(crate) fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("<order {}>", self.order),
        }
    }
}

/// How `ConfigSourceList::from_specs` fills in missing orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    /// Every spec must carry an explicit order.
    Explicit,
    /// A missing order falls back to the spec's position in the list.
    Implicit,
}

/// An ordered list of config sources merged lowest order first.
#[derive(Debug, Clone, Default)]
pub struct ConfigSourceList {
    name: Option<String>,
    sources: Vec<ConfigSource>,
}

impl ConfigSourceList {
    /// Build a list from specs, resolving and checking orders.
    pub fn from_specs(specs: Vec<SourceSpec>, mode: OrderMode) -> Result<Self> {
        let mut sources: Vec<ConfigSource> = Vec::with_capacity(specs.len());
        let mut seen = BTreeSet::new();
        for (index, spec) in specs.into_iter().enumerate() {
            let order = match (spec.order, mode) {
                (Some(order), _) => order,
                (None, OrderMode::Implicit) => index as i64,
                (None, OrderMode::Explicit) => {
                    return Err(ConfigError::MissingOrder { index });
                }
            };
            let source = ConfigSource::new(spec, order)?;
            if !seen.insert(order) {
                return Err(ConfigError::AmbiguousOrder {
                    order,
                    name: source.display_name(),
                });
            }
            sources.push(source);
        }
        sources.sort_by_key(|source| source.order());
        Ok(ConfigSourceList {
            name: None,
            sources,
        })
    }

    /// Build a list from a raw declaration.
    ///
    /// Null resolves to a single empty in-memory source; a mapping or path
    /// string becomes a single source at order 0; a sequence is a full
    /// source list whose items must each carry an explicit order.
    pub fn from_value(value: Value) -> Result<Self> {
        let specs = match value {
            Value::Null => vec![SourceSpec::new(Value::Mapping(Mapping::new())).with_order(0)],
            Value::Sequence(items) => {
                let mut specs = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let spec: SourceSpec = serde_yaml::from_value(item).map_err(|e| {
                        ConfigError::InvalidSource(format!("source item {index}: {e}"))
                    })?;
                    specs.push(spec);
                }
                return ConfigSourceList::from_specs(specs, OrderMode::Explicit);
            }
            payload @ (Value::Mapping(_) | Value::String(_)) => {
                vec![SourceSpec::new(payload).with_order(0)]
            }
            other => {
                return Err(ConfigError::InvalidSource(format!(
                    "cannot build config sources from {other:?}"
                )));
            }
        };
        ConfigSourceList::from_specs(specs, OrderMode::Explicit)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ConfigSource> {
        self.sources.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ConfigSource> {
        self.sources.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigSource> {
        self.sources.iter()
    }

    /// Load every enabled source and merge the results in order.
    pub fn load(&self, context: Option<&Mapping>) -> Result<Mapping> {
        let mut merged = Mapping::new();
        for source in &self.sources {
            if !source.is_enabled_for(context) {
                tracing::debug!(source = %source.display_name(), "Skipping disabled source");
                continue;
            }
            let data = source
                .load(context)
                .map_err(|e| e.for_source(source.display_name(), source.order()))?;
            merge::merge_mappings(&mut merged, data)
                .map_err(|e| e.for_source(source.display_name(), source.order()))?;
        }
        Ok(merged)
    }

    /// Find the source a given key path resolves from.
    pub fn locate(&self, _key: &str) -> Result<&ConfigSource> {
        Err(ConfigError::NotSupported(
            "locating the source of a key".to_string(),
        ))
    }

    /// Plain-data description of every source, in order.
    pub fn describe(&self) -> Value {
        Value::Sequence(self.sources.iter().map(ConfigSource::describe).collect())
    }
}

fn resolve_payload(source: Value) -> Result<SourcePayload> {
    match source {
        Value::String(raw) => {
            let expanded = expand_home(&raw);
            let path = fs::canonicalize(&expanded).map_err(|e| ConfigError::Io {
                path: expanded,
                source: e,
            })?;
            if !path.is_file() {
                return Err(ConfigError::InvalidSource(format!(
                    "{} is not a file",
                    path.display()
                )));
            }
            Ok(SourcePayload::File(path))
        }
        Value::Mapping(_) => Ok(SourcePayload::Value(source)),
        Value::Sequence(items) => {
            if items.is_empty() || items.iter().all(|item| matches!(item, Value::String(_))) {
                return Ok(SourcePayload::Value(Value::Sequence(items)));
            }
            if items.iter().all(|item| matches!(item, Value::Mapping(_))) {
                let mut specs = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let spec: SourceSpec = serde_yaml::from_value(item).map_err(|e| {
                        ConfigError::InvalidSource(format!("nested source item {index}: {e}"))
                    })?;
                    specs.push(spec);
                }
                return Ok(SourcePayload::Nested(ConfigSourceList::from_specs(
                    specs,
                    OrderMode::Implicit,
                )?));
            }
            Err(ConfigError::InvalidSource(
                "sequence sources hold either strings or source mappings".to_string(),
            ))
        }
        other => Err(ConfigError::InvalidSource(format!(
            "cannot build a config source from {other:?}"
        ))),
    }
}

fn resolve_format(payload: &SourcePayload, explicit: Option<String>) -> Result<String> {
    let input = match payload {
        SourcePayload::Nested(_) => {
            return match explicit {
                None => Ok(FORMAT_SOURCES.to_string()),
                Some(name) if name == FORMAT_SOURCES => Ok(name),
                Some(name) => Err(ConfigError::InvalidSource(format!(
                    "nested source lists use format {FORMAT_SOURCES:?}, not {name:?}"
                ))),
            };
        }
        SourcePayload::File(path) => FormatInput::File(path),
        SourcePayload::Value(value) => FormatInput::Value(value),
    };
    if let Some(name) = explicit {
        if !default_registry().contains(&name) {
            return Err(ConfigError::FormatNotFound {
                what: format!("format {name:?}"),
            });
        }
        return Ok(name);
    }
    default_registry()
        .identify(&input)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::FormatNotFound {
            what: match payload {
                SourcePayload::File(path) => format!("format of {}", path.display()),
                _ => "format of in-memory payload".to_string(),
            },
        })
}

fn resolve_name(explicit: Option<String>, payload: &SourcePayload) -> Option<String> {
    match explicit {
        Some(name) => Some(name),
        None => match payload {
            SourcePayload::File(path) => Some(path.display().to_string()),
            SourcePayload::Nested(list) => list.name().map(str::to_string),
            SourcePayload::Value(_) => None,
        },
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(dirs) = BaseDirs::new()
    {
        return dirs.home_dir().join(rest);
    }
    if raw == "~"
        && let Some(dirs) = BaseDirs::new()
    {
        return dirs.home_dir().to_path_buf();
    }
    PathBuf::from(raw)
}
