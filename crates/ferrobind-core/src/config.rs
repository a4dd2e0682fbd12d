//! Bridge configuration (ferrobind.toml)
//!
//! Every field has a default, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Bridge settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Wrap constructors and methods in named shims for profiling
    #[serde(default)]
    pub profiler_enabled: bool,

    /// Application root, stripped from script paths when deriving extend locations
    #[serde(default = "default_app_root")]
    pub app_root: String,

    /// Prefix of every class name synthesized by `extend`
    #[serde(default = "default_generated_class_prefix")]
    pub generated_class_prefix: String,

    /// Columns added on line 1 by the module wrapper
    #[serde(default)]
    pub module_prologue_length: i32,

    /// Class whose prototype backs every array proxy
    #[serde(default = "default_root_class_name")]
    pub root_class_name: String,

    /// Directory holding `nodes.dat`, `names.dat` and `values.dat`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_dir: Option<PathBuf>,
}

fn default_app_root() -> String {
    "/data/app/".to_string()
}

fn default_generated_class_prefix() -> String {
    "com/ferrobind/gen/".to_string()
}

fn default_root_class_name() -> String {
    "java/lang/Object".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            profiler_enabled: false,
            app_root: default_app_root(),
            generated_class_prefix: default_generated_class_prefix(),
            module_prologue_length: 0,
            root_class_name: default_root_class_name(),
            metadata_dir: None,
        }
    }
}

impl BridgeConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_class_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "root_class_name cannot be empty".to_string(),
            ));
        }
        if self.module_prologue_length < 0 {
            return Err(ConfigError::ValidationError(
                "module_prologue_length cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
