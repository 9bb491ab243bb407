//! Component core configuration.
use anyhow::{Context as _, Error};
use serde::{Deserialize, Serialize};

/// Configurable parameters of the component core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    /// Look up new components in the cache and store model counts of solved ones. (Default: true)
    pub perform_component_caching: bool,

    /// Memory budget of the component cache in bytes. (Default: 1 GiB)
    pub cache_max_bytes: usize,
}

impl Default for ComponentConfig {
    fn default() -> ComponentConfig {
        ComponentConfig {
            perform_component_caching: true,
            cache_max_bytes: 1 << 30,
        }
    }
}

impl ComponentConfig {
    /// Apply a partial update.
    pub fn apply(&mut self, update: &ComponentConfigUpdate) {
        if let Some(value) = update.perform_component_caching {
            self.perform_component_caching = value;
        }
        if let Some(value) = update.cache_max_bytes {
            self.cache_max_bytes = value;
        }
    }
}

/// Partial update of a [`ComponentConfig`].
///
/// Unset fields leave the current value unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfigUpdate {
    pub perform_component_caching: Option<bool>,
    pub cache_max_bytes: Option<usize>,
}

impl ComponentConfigUpdate {
    /// Parse an update from TOML text.
    pub fn from_toml(text: &str) -> Result<ComponentConfigUpdate, Error> {
        toml::from_str(text).context("Could not parse component configuration")
    }

    /// Merge another update into this one, values set in `other` take precedence.
    pub fn merge(&mut self, other: ComponentConfigUpdate) {
        if other.perform_component_caching.is_some() {
            self.perform_component_caching = other.perform_component_caching;
        }
        if other.cache_max_bytes.is_some() {
            self.cache_max_bytes = other.cache_max_bytes;
        }
    }
}
