//! Layered runtime configuration backend.
//!
//! Responsibilities:
//! - Own the source list, the activation context, and the default, info,
//!   and override layers.
//! - Compose `default <- sources <- info <- override` into a validated
//!   [`RuntimeConfig`], memoizing both the source merge and the result.
//! - Invalidate with the right granularity: layer edits recompose without
//!   touching sources, source reloads drop both caches.
//!
//! Does NOT handle:
//! - Source construction or format IO (see source.rs, format.rs).
//!
//! Invariants:
//! - The info layer always carries the `runtime_info` provenance block,
//!   so a composition that loses it fails validation.
//! - `config()` never returns a stale composition after a layer edit.

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};
use crate::info::{ConfigSnapshot, RuntimeConfig, RuntimeInfo};
use crate::merge;
use crate::source::ConfigSourceList;

/// Four-layer configuration resolver over an ordered source list.
#[derive(Debug)]
pub struct ConfigBackend {
    sources: ConfigSourceList,
    context: Option<Mapping>,
    default_layer: Mapping,
    info_layer: Mapping,
    override_layer: Mapping,
    source_cache: Option<Mapping>,
    composed_cache: Option<RuntimeConfig>,
}

impl ConfigBackend {
    /// Build a backend over a raw source declaration and load it.
    pub fn new(sources: Value) -> Result<Self> {
        Self::new_with_context(sources, None)
    }

    /// Like [`ConfigBackend::new`], with a context for `enable_if`
    /// predicates to evaluate against.
    pub fn new_with_context(sources: Value, context: Option<Mapping>) -> Result<Self> {
        let sources = ConfigSourceList::from_value(sources)?;
        Self::from_sources(sources, context)
    }

    /// Build a backend over an already constructed source list.
    ///
    /// Sources are loaded eagerly so construction surfaces load failures.
    pub fn from_sources(sources: ConfigSourceList, context: Option<Mapping>) -> Result<Self> {
        let mut info_layer = Mapping::new();
        info_layer.insert(
            Value::from("runtime_info"),
            serde_yaml::to_value(RuntimeInfo::new(sources.describe()))?,
        );
        let mut backend = ConfigBackend {
            sources,
            context,
            default_layer: Mapping::new(),
            info_layer,
            override_layer: Mapping::new(),
            source_cache: None,
            composed_cache: None,
        };
        // fill the source cache only; composition waits for the first read
        backend.load_source_config()?;
        Ok(backend)
    }

    pub fn sources(&self) -> &ConfigSourceList {
        &self.sources
    }

    /// Mutable source access. A caller that dumps into a source must follow
    /// with [`ConfigBackend::load_source_config`] to see the change.
    pub fn sources_mut(&mut self) -> &mut ConfigSourceList {
        &mut self.sources
    }

    pub fn context(&self) -> Option<&Mapping> {
        self.context.as_ref()
    }

    /// Swap the activation context and reload, since it changes which
    /// sources are enabled.
    pub fn set_context(&mut self, context: Option<Mapping>) -> Result<&RuntimeConfig> {
        self.context = context;
        self.load(true)
    }

    pub fn default_config(&self) -> &Mapping {
        &self.default_layer
    }

    pub fn override_config(&self) -> &Mapping {
        &self.override_layer
    }

    /// The merged result of the enabled sources, loading on first use.
    pub fn source_config(&mut self) -> Result<&Mapping> {
        let source = match self.source_cache.take() {
            Some(cached) => cached,
            None => self.sources.load(self.context.as_ref())?,
        };
        Ok(self.source_cache.insert(source))
    }

    /// The composed runtime configuration, composing on first use.
    pub fn config(&mut self) -> Result<&RuntimeConfig> {
        let composed = match self.composed_cache.take() {
            Some(cached) => cached,
            None => self.compose()?,
        };
        Ok(self.composed_cache.insert(composed))
    }

    /// Recompute the composition, optionally reloading sources first.
    pub fn load(&mut self, reload_source: bool) -> Result<&RuntimeConfig> {
        if reload_source {
            tracing::debug!("Invalidating cached source config");
            self.source_cache = None;
        }
        self.composed_cache = None;
        self.config()
    }

    /// Drop and reload the source merge along with the composition built
    /// on top of it.
    pub fn load_source_config(&mut self) -> Result<&Mapping> {
        tracing::debug!("Reloading config sources");
        self.source_cache = None;
        self.composed_cache = None;
        self.source_config()
    }

    /// Replace the default layer and recompose.
    pub fn set_default_config(&mut self, layer: Mapping) -> Result<&RuntimeConfig> {
        self.default_layer = layer;
        self.load(false)
    }

    /// Merge an update into the default layer and recompose.
    pub fn update_default_config(&mut self, update: Mapping) -> Result<&RuntimeConfig> {
        merge::merge_mappings(&mut self.default_layer, update)?;
        self.load(false)
    }

    /// Replace the override layer and recompose.
    pub fn set_override_config(&mut self, layer: Mapping) -> Result<&RuntimeConfig> {
        self.override_layer = layer;
        self.load(false)
    }

    /// Merge an update into the override layer and recompose.
    pub fn update_override_config(&mut self, update: Mapping) -> Result<&RuntimeConfig> {
        merge::merge_mappings(&mut self.override_layer, update)?;
        self.load(false)
    }

    pub fn runtime_info(&mut self) -> Result<&RuntimeInfo> {
        Ok(&self.config()?.runtime_info)
    }

    /// The composed config as a plain mapping.
    pub fn to_mapping(&mut self, exclude_runtime_info: bool) -> Result<Mapping> {
        let config = self.config()?;
        let value = serde_yaml::to_value(config)?;
        let Value::Mapping(mut map) = value else {
            return Err(ConfigError::Validation(
                "composed config did not serialize to a mapping".to_string(),
            ));
        };
        if exclude_runtime_info {
            // rebuild rather than remove, to keep key order stable
            let needle = Value::from("runtime_info");
            map = map.into_iter().filter(|(key, _)| key != &needle).collect();
        }
        Ok(map)
    }

    pub fn to_yaml(&mut self, exclude_runtime_info: bool) -> Result<String> {
        let map = self.to_mapping(exclude_runtime_info)?;
        Ok(serde_yaml::to_string(&map)?)
    }

    /// Export the composed config (without provenance) with free-form
    /// metadata attached.
    pub fn snapshot(&mut self, meta: Mapping) -> Result<ConfigSnapshot> {
        Ok(ConfigSnapshot::new(self.to_mapping(true)?, meta))
    }

    fn compose(&mut self) -> Result<RuntimeConfig> {
        let source = self.source_config()?.clone();
        let mut composed = Mapping::new();
        merge::merge_mappings(&mut composed, self.default_layer.clone())?;
        merge::merge_mappings(&mut composed, source)?;
        merge::merge_mappings(&mut composed, self.info_layer.clone())?;
        merge::merge_mappings(&mut composed, self.override_layer.clone())?;
        serde_yaml::from_value(Value::Mapping(composed))
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }
}

/// Convenience wrapper for consumers that just want the composed config.
#[derive(Debug)]
pub struct RuntimeContext {
    backend: ConfigBackend,
}

impl RuntimeContext {
    pub fn new(sources: Value) -> Result<Self> {
        Ok(RuntimeContext {
            backend: ConfigBackend::new(sources)?,
        })
    }

    pub fn new_with_context(sources: Value, context: Mapping) -> Result<Self> {
        Ok(RuntimeContext {
            backend: ConfigBackend::new_with_context(sources, Some(context))?,
        })
    }

    pub fn config(&mut self) -> Result<&RuntimeConfig> {
        self.backend.config()
    }

    pub fn runtime_info(&mut self) -> Result<&RuntimeInfo> {
        self.backend.runtime_info()
    }

    pub fn backend(&self) -> &ConfigBackend {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut ConfigBackend {
        &mut self.backend
    }
}
