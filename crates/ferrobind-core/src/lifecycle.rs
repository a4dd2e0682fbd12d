//! Per-engine caches, top-level namespaces and disposal
//!
//! Everything an engine instance materializes is cached here and lives
//! exactly as long as the engine. Disposal also purges the engine's entries
//! from the process-wide MetadataNodes so that other instances are unaffected.

use std::rc::Rc;
use std::sync::Arc;

use ferrobind_metadata::{NodeKind, TreeNodeId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bridge::Bridge;
use crate::engine::{Engine, EngineId, ObjectId, ObjectTemplate, Value};
use crate::error::BridgeResult;
use crate::materialize::Blueprint;
use crate::node::MetadataNode;
use crate::proxy;

/// Script-language reserved words
const RESERVED_WORDS: &[&str] = &[
    "abstract", "arguments", "boolean", "break", "byte", "case", "catch", "char", "class", "const", "continue",
    "debugger", "default", "delete", "do", "double", "else", "enum", "eval", "export", "extends", "false", "final",
    "finally", "float", "for", "function", "goto", "if", "implements", "import", "in", "instanceof", "int",
    "interface", "let", "long", "native", "new", "null", "package", "private", "protected", "public", "return",
    "short", "static", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "true", "try",
    "typeof", "var", "void", "volatile", "while", "with", "yield",
];

/// True if `name` collides with a script-language reserved word
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Class synthesized by `extend` in one engine
#[derive(Debug, Clone)]
pub struct ExtendedClass {
    /// Synthesized constructor
    pub constructor: ObjectId,
    /// Synthesized class name
    pub name: String,
    /// Node of the extended base type
    pub node: Arc<MetadataNode>,
}

/// Counters of cache activity in one engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Blueprint build passes
    pub blueprints_built: usize,
    /// Classes created by `extend`
    pub extended_classes_created: usize,
}

/// Per-engine cache
#[derive(Default)]
pub(crate) struct InstanceCache {
    pub(crate) blueprints: FxHashMap<TreeNodeId, Rc<Blueprint>>,
    pub(crate) extended_classes: FxHashMap<String, ExtendedClass>,
    pub(crate) array_template: Option<Rc<ObjectTemplate>>,
    pub(crate) in_progress: FxHashSet<TreeNodeId>,
    pub(crate) stats: CacheStats,
}

impl InstanceCache {
    pub(crate) fn blueprint(&self, tree_node: TreeNodeId) -> Option<Rc<Blueprint>> {
        self.blueprints.get(&tree_node).cloned()
    }

    pub(crate) fn extended_class(&self, name: &str) -> Option<&ExtendedClass> {
        self.extended_classes.get(name)
    }
}

/// Populate `global` with one entry per top-level package
///
/// Names colliding with reserved words are prefixed with `$`.
pub fn create_top_level_namespaces(engine: &mut Engine, global: ObjectId) -> BridgeResult<()> {
    let bridge = engine.bridge().clone();
    let reader = bridge.reader();
    for child in reader.children(reader.root()) {
        if reader.kind(child) != NodeKind::Package {
            continue;
        }
        let name = reader.name(child);
        let node = bridge.node_for_tree(child)?;
        let package = proxy::create_wrapper(engine, &node)?;

        let property = if is_reserved_word(&name) {
            format!("${name}")
        } else {
            name.to_string()
        };
        engine.define_data(global, property.as_str(), Value::Object(package));
    }
    Ok(())
}

pub(crate) fn on_dispose(engine: EngineId, bridge: &Bridge) {
    bridge.registry().purge_engine(engine);
    tracing::debug!(engine = %engine, "Disposed engine instance");
}
