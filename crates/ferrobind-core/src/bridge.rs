//! Process-wide bridge state
//!
//! The [`Bridge`] is shared by every engine instance: it owns the decoded
//! metadata tree, the foreign runtime, the configuration and the global
//! MetadataNode registries. Engines hold it through an `Arc`.

use std::path::PathBuf;
use std::sync::Arc;

use ferrobind_metadata::{LoadError, MetadataBuffers, MetadataReader, TreeNodeId, TypeMetadataProvider};
use once_cell::sync::OnceCell;

use crate::config::{BridgeConfig, ConfigError};
use crate::error::{BridgeError, BridgeResult};
use crate::foreign::ForeignRuntime;
use crate::node::{MetadataNode, MetadataRegistry};

static GLOBAL: OnceCell<Arc<Bridge>> = OnceCell::new();

/// Lazy metadata source backed by the foreign runtime
struct RuntimeMetadata(Arc<dyn ForeignRuntime>);

impl TypeMetadataProvider for RuntimeMetadata {
    fn type_metadata(&self, name: &str) -> Option<String> {
        self.0.type_metadata(name)
    }
}

/// Process-wide binding state
pub struct Bridge {
    reader: MetadataReader,
    runtime: Arc<dyn ForeignRuntime>,
    config: BridgeConfig,
    registry: MetadataRegistry,
}

impl Bridge {
    /// Build a bridge over already loaded metadata buffers
    pub fn new(buffers: MetadataBuffers, runtime: Arc<dyn ForeignRuntime>, config: BridgeConfig) -> BridgeResult<Arc<Self>> {
        config.validate()?;
        let reader = MetadataReader::from_buffers(buffers)?.with_provider(Box::new(RuntimeMetadata(runtime.clone())));
        Ok(Arc::new(Self {
            reader,
            runtime,
            config,
            registry: MetadataRegistry::new(),
        }))
    }

    /// Load metadata from `config.metadata_dir` and build a bridge
    ///
    /// When the metadata directory cannot be opened because storage is still
    /// locked, the process exits cleanly with status 0.
    pub fn bootstrap(config: BridgeConfig, runtime: Arc<dyn ForeignRuntime>) -> BridgeResult<Arc<Self>> {
        let dir: PathBuf = config
            .metadata_dir
            .clone()
            .ok_or_else(|| ConfigError::ValidationError("metadata_dir is not set".to_string()))?;

        let buffers = match MetadataBuffers::load_from_dir(&dir) {
            Ok(buffers) => buffers,
            Err(LoadError::StorageLocked { path, source }) => {
                tracing::error!(
                    path = %path.display(),
                    error = %source,
                    "Metadata storage is locked; exiting"
                );
                std::process::exit(0);
            }
            Err(e) => return Err(e.into()),
        };
        Self::new(buffers, runtime, config)
    }

    /// Make `bridge` the process-wide instance
    ///
    /// Fails if one is already installed.
    pub fn install(bridge: Arc<Bridge>) -> BridgeResult<()> {
        GLOBAL
            .set(bridge)
            .map_err(|_| BridgeError::internal("bridge is already installed"))
    }

    /// The process-wide instance, if installed
    pub fn global() -> Option<Arc<Bridge>> {
        GLOBAL.get().cloned()
    }

    /// Decoded metadata tree
    pub fn reader(&self) -> &MetadataReader {
        &self.reader
    }

    /// Foreign runtime
    pub fn runtime(&self) -> &Arc<dyn ForeignRuntime> {
        &self.runtime
    }

    /// Configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Global registries
    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    /// MetadataNode for a full type name
    pub fn node(&self, name: &str) -> BridgeResult<Arc<MetadataNode>> {
        Ok(self.registry.node_for_name(&self.reader, name)?)
    }

    /// MetadataNode for a tree node
    pub fn node_for_tree(&self, tree_node: TreeNodeId) -> BridgeResult<Arc<MetadataNode>> {
        Ok(self.registry.node_for_tree(&self.reader, tree_node)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{empty_buffers, NullRuntime};

    #[test]
    fn test_new_validates_config() {
        let config = BridgeConfig {
            root_class_name: String::new(),
            ..BridgeConfig::default()
        };
        let result = Bridge::new(empty_buffers(), Arc::new(NullRuntime), config);
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_bootstrap_requires_metadata_dir() {
        let result = Bridge::bootstrap(BridgeConfig::default(), Arc::new(NullRuntime));
        assert!(matches!(result, Err(BridgeError::Config(ConfigError::ValidationError(_)))));
    }

    #[test]
    fn test_bootstrap_loads_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        empty_buffers().write_to_dir(dir.path()).unwrap();
        let config = BridgeConfig {
            metadata_dir: Some(dir.path().to_path_buf()),
            ..BridgeConfig::default()
        };
        let bridge = Bridge::bootstrap(config, Arc::new(NullRuntime)).unwrap();
        assert!(bridge.node("java/lang/Object").is_ok());
    }

    #[test]
    fn test_bootstrap_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            metadata_dir: Some(dir.path().to_path_buf()),
            ..BridgeConfig::default()
        };
        let result = Bridge::bootstrap(config, Arc::new(NullRuntime));
        assert!(matches!(result, Err(BridgeError::Load(LoadError::MissingFile { .. }))));
    }
}
