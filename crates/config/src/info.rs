//! Runtime provenance attached to composed configuration.
//!
//! Responsibilities:
//! - Capture facts about the running process (user, platform, executable,
//!   command line) at backend construction.
//! - Define the `runtime_info` block the backend injects into every
//!   composed config, and the snapshot envelope used for exports.
//!
//! Does NOT handle:
//! - Deciding when the block is injected or stripped (see backend.rs).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::Result;

/// Facts about the running process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub username: String,
    pub platform: String,
    pub exec_path: PathBuf,
    pub cmd: String,
}

impl SystemInfo {
    pub fn collect() -> Self {
        let username = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let exec_path = std::env::current_exe()
            .unwrap_or_else(|_| PathBuf::from(std::env::args().next().unwrap_or_default()));
        let cmd = std::env::args().collect::<Vec<_>>().join(" ");
        SystemInfo {
            username,
            platform: std::env::consts::OS.to_string(),
            exec_path,
            cmd,
        }
    }
}

/// Provenance block keyed `runtime_info` in every composed config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub created_at: DateTime<Utc>,
    /// Plain-data description of the source list the config came from.
    pub config_sources: Value,
    pub system: SystemInfo,
}

impl RuntimeInfo {
    pub fn new(config_sources: Value) -> Self {
        RuntimeInfo {
            created_at: Utc::now(),
            config_sources,
            system: SystemInfo::collect(),
        }
    }
}

/// A fully composed runtime configuration: the merged payload plus its
/// provenance. Deserializing validates that the `runtime_info` block is
/// present and well formed; all other keys land in `config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub runtime_info: RuntimeInfo,
    #[serde(flatten)]
    pub config: Mapping,
}

/// A point-in-time export of composed configuration with free-form
/// metadata, e.g. for writing setup results to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub created_at: DateTime<Utc>,
    pub config: Mapping,
    pub meta: Mapping,
}

impl ConfigSnapshot {
    pub fn new(config: Mapping, meta: Mapping) -> Self {
        ConfigSnapshot {
            created_at: Utc::now(),
            config,
            meta,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
