//! Application configuration
//!
//! Loaded from YAML or JSON. Every field has a default, so an empty document
//! is a valid configuration.
//!
//! `aliases` and `response_timeout_ms` are connection settings. The OGM does
//! not read them; code that builds a remote [`GraphClient`] takes them from
//! [`Ogm::config`]. The embedded client has neither.
//!
//! [`GraphClient`]: crate::client::GraphClient
//! [`Ogm::config`]: crate::Ogm::config

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{OgmError, OgmResult};
use crate::provider::ProviderKind;

/// OGM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OgmConfig {
    /// Graph provider whose id conventions apply
    pub provider: ProviderKind,
    /// Traversal source aliases for a remote client, e.g. `g -> graph_g`
    pub aliases: IndexMap<String, String>,
    /// Response timeout for a remote client. The OGM never enforces it.
    pub response_timeout_ms: u64,
    /// Log level for `logging::init_tracing`
    pub log_level: String,
}

impl Default for OgmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            aliases: IndexMap::new(),
            response_timeout_ms: 30_000,
            log_level: "info".to_string(),
        }
    }
}

impl OgmConfig {
    pub fn from_yaml_str(s: &str) -> OgmResult<Self> {
        serde_yaml::from_str(s).map_err(|e| OgmError::Config(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> OgmResult<Self> {
        serde_json::from_str(s).map_err(|e| OgmError::Config(e.to_string()))
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> OgmResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            _ => Err(OgmError::Config(format!(
                "Unsupported configuration file: {}",
                path.display()
            ))),
        }
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}
