//! MetadataNode and the process-wide registries
//!
//! A [`MetadataNode`] is the runtime-side identity of one foreign type (or
//! package). Exactly one exists per tree node, and each distinct name maps to
//! at most one node; `extend` adds further names as aliases of an existing
//! node. Nodes are never removed. Each node remembers the materialized
//! constructor of every engine instance that has built it.
//!
//! All three maps of [`MetadataRegistry`] live behind one mutex. Lookups and
//! node construction run outside the lock; the insert afterwards keeps
//! whichever value won the race, so every caller observes the same node.

use std::sync::Arc;

use ferrobind_metadata::{MetadataReader, MetadataResult, NodeKind, TreeNodeId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::engine::{EngineId, ObjectId};

/// Runtime identity of one foreign type or package
#[derive(Debug)]
pub struct MetadataNode {
    tree_node: TreeNodeId,
    name: String,
    kind: NodeKind,
    is_array: bool,
    implementation_type: Option<String>,
    constructors: Mutex<FxHashMap<EngineId, ObjectId>>,
}

impl MetadataNode {
    fn from_tree(reader: &MetadataReader, tree_node: TreeNodeId) -> MetadataResult<Self> {
        let name = reader.read_type_name(tree_node);
        let kind = reader.kind(tree_node);
        let is_array = reader.is_array_type(tree_node);

        let implementation_type = if kind == NodeKind::Interface && !is_array {
            reader.interface_implementation(tree_node)?.map(|implementation| {
                if implementation.is_prefix {
                    format!("{}{}", implementation.name, name)
                } else {
                    implementation.name
                }
            })
        } else {
            None
        };

        Ok(Self {
            tree_node,
            name,
            kind,
            is_array,
            implementation_type,
            constructors: Mutex::new(FxHashMap::default()),
        })
    }

    /// Full type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing tree node
    pub fn tree_node(&self) -> TreeNodeId {
        self.tree_node
    }

    /// Kind of the backing tree node
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// True if the node's parent is the array marker
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// True for interfaces
    pub fn is_interface(&self) -> bool {
        self.kind == NodeKind::Interface
    }

    /// Class that implements this interface in the foreign runtime
    pub fn implementation_type(&self) -> Option<&str> {
        self.implementation_type.as_deref()
    }

    /// Materialized constructor in `engine`, if built
    pub fn constructor_in(&self, engine: EngineId) -> Option<ObjectId> {
        self.constructors.lock().get(&engine).copied()
    }

    pub(crate) fn set_constructor(&self, engine: EngineId, constructor: ObjectId) {
        self.constructors.lock().insert(engine, constructor);
    }

    pub(crate) fn forget_engine(&self, engine: EngineId) {
        self.constructors.lock().remove(&engine);
    }

    /// Number of engine instances holding a constructor for this node
    pub fn engine_count(&self) -> usize {
        self.constructors.lock().len()
    }
}

#[derive(Default)]
struct RegistryMaps {
    name_to_tree: FxHashMap<String, TreeNodeId>,
    tree_to_node: FxHashMap<TreeNodeId, Arc<MetadataNode>>,
    name_to_node: FxHashMap<String, Arc<MetadataNode>>,
}

/// Process-wide name, tree node and MetadataNode registries
#[derive(Default)]
pub struct MetadataRegistry {
    maps: Mutex<RegistryMaps>,
}

impl MetadataRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree node for a full type name, memoized
    pub fn resolve_tree_node(&self, reader: &MetadataReader, name: &str) -> MetadataResult<TreeNodeId> {
        if let Some(id) = self.maps.lock().name_to_tree.get(name) {
            return Ok(*id);
        }
        let id = reader.get_or_create_tree_node_by_name(name)?;
        Ok(*self.maps.lock().name_to_tree.entry(name.to_string()).or_insert(id))
    }

    /// MetadataNode for a tree node, created on first request
    pub fn node_for_tree(&self, reader: &MetadataReader, tree_node: TreeNodeId) -> MetadataResult<Arc<MetadataNode>> {
        if let Some(node) = self.maps.lock().tree_to_node.get(&tree_node) {
            return Ok(node.clone());
        }
        let node = Arc::new(MetadataNode::from_tree(reader, tree_node)?);
        Ok(self
            .maps
            .lock()
            .tree_to_node
            .entry(tree_node)
            .or_insert(node)
            .clone())
    }

    /// MetadataNode for a full type name, memoizing the name edge separately
    pub fn node_for_name(&self, reader: &MetadataReader, name: &str) -> MetadataResult<Arc<MetadataNode>> {
        if let Some(node) = self.lookup(name) {
            return Ok(node);
        }
        let tree_node = self.resolve_tree_node(reader, name)?;
        let node = self.node_for_tree(reader, tree_node)?;
        Ok(self.register_alias(name, node))
    }

    /// Map `name` to `node` unless the name is already taken
    ///
    /// Returns the node the name maps to afterwards.
    pub fn register_alias(&self, name: &str, node: Arc<MetadataNode>) -> Arc<MetadataNode> {
        self.maps
            .lock()
            .name_to_node
            .entry(name.to_string())
            .or_insert(node)
            .clone()
    }

    /// MetadataNode registered under `name`
    pub fn lookup(&self, name: &str) -> Option<Arc<MetadataNode>> {
        self.maps.lock().name_to_node.get(name).cloned()
    }

    /// Every node created so far
    pub fn nodes(&self) -> Vec<Arc<MetadataNode>> {
        self.maps.lock().tree_to_node.values().cloned().collect()
    }

    /// Number of nodes created so far
    pub fn len(&self) -> usize {
        self.maps.lock().tree_to_node.len()
    }

    /// True if no node has been created
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every constructor handle belonging to `engine`
    pub fn purge_engine(&self, engine: EngineId) {
        let nodes = {
            let maps = self.maps.lock();
            maps.tree_to_node
                .values()
                .chain(maps.name_to_node.values())
                .cloned()
                .collect::<Vec<_>>()
        };
        for node in nodes {
            node.forget_engine(engine);
        }
    }
}
