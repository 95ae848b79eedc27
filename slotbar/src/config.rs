//! Configuration for Slotbar.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use slot_tree::DEFAULT_SLOT_KEY;
use visibility::DEFAULT_VISIBILITY_KEY;

use crate::types::{Result, SlotbarError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotbarConfig {
    /// Where configuration blobs are stored
    #[serde(default)]
    pub storage: StorageConfig,
    /// Runtime action registration
    #[serde(default)]
    pub registry: RegistryConfig,
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

impl SlotbarConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Load config from a YAML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SlotbarError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&yaml).map_err(|e| SlotbarError::Config(format!("{}: {e}", path.display())))
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the JSON blob files
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    /// Blob key of the slot tree
    #[serde(default = "default_slot_key")]
    pub slot_key: String,
    /// Blob key of the visibility rules
    #[serde(default = "default_visibility_key")]
    pub visibility_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            slot_key: default_slot_key(),
            visibility_key: default_visibility_key(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./slotbar-data")
}

fn default_slot_key() -> String {
    DEFAULT_SLOT_KEY.to_string()
}

fn default_visibility_key() -> String {
    DEFAULT_VISIBILITY_KEY.to_string()
}

/// Runtime registration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Icon given to registered actions that do not name one
    #[serde(default = "default_icon")]
    pub default_icon: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_icon: default_icon(),
        }
    }
}

fn default_icon() -> String {
    "fas fa-puzzle-piece".to_string()
}

/// General configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SlotbarConfig::default();
        assert_eq!(config.storage.slot_key, "slot_configuration");
        assert_eq!(config.storage.visibility_key, "visibility");
        assert_eq!(config.registry.default_icon, "fas fa-puzzle-piece");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = SlotbarConfig::from_yaml("storage:\n  dir: /var/lib/slotbar\n").unwrap();
        assert_eq!(config.storage.dir, PathBuf::from("/var/lib/slotbar"));
        assert_eq!(config.storage.slot_key, "slot_configuration");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = SlotbarConfig::default();
        config.general.log_level = "debug".to_string();
        let yaml = config.to_yaml().unwrap();
        let parsed = SlotbarConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.general.log_level, "debug");
    }

    #[test]
    fn test_load_missing_file() {
        let result = tokio_test::block_on(SlotbarConfig::load("/nonexistent/slotbar.yaml"));
        assert!(matches!(result, Err(SlotbarError::Config(_))));
    }
}
