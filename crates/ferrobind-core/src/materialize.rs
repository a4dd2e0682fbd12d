//! Type wrapper materializer
//!
//! Builds the constructor blueprint of a foreign type the first time an
//! engine asks for it. The base type is materialized first so that the new
//! prototype chains onto the base prototype and the new constructor onto the
//! base constructor, mirroring the foreign class hierarchy.
//!
//! # Hierarchy skips
//!
//! The metadata snapshot can disagree with the classes actually present in
//! the foreign runtime. When the runtime knows the class being built, every
//! declared base it reports as not assignable is skipped, and the skipped
//! types' instance methods are merged into this blueprint instead.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use ferrobind_metadata::{TreeNodeId, TypeMembers};

use crate::engine::{Accessor, Engine, NativeCallback, ObjectId, PrivateKey, PrivateValue, Value};
use crate::error::{BridgeError, BridgeResult};
use crate::members::{self, MethodGroup, MethodTable};
use crate::node::MetadataNode;
use crate::profiler;

/// Materialized constructor and prototype of one foreign type
pub struct Blueprint {
    /// Type this blueprint was built for
    pub node: Arc<MetadataNode>,
    /// Script constructor (the profiling shim when profiling is enabled)
    pub constructor: ObjectId,
    /// Prototype shared by every instance
    pub prototype: ObjectId,
    pub(crate) methods: MethodTable,
}

impl Blueprint {
    /// Effective method group for `name`, own or inherited
    pub fn method(&self, name: &str) -> Option<&Rc<MethodGroup>> {
        self.methods.get(name)
    }
}

/// Blueprint of the type at `tree_node`, built on first use per engine
pub fn materialize(engine: &mut Engine, tree_node: TreeNodeId) -> BridgeResult<Rc<Blueprint>> {
    if let Some(blueprint) = engine.cache().blueprint(tree_node) {
        return Ok(blueprint);
    }

    if !engine.cache_mut().in_progress.insert(tree_node) {
        let name = engine.bridge().reader().read_type_name(tree_node);
        return Err(BridgeError::internal(format!("cyclic base class chain at {name}")));
    }
    let result = build(engine, tree_node);
    engine.cache_mut().in_progress.remove(&tree_node);
    result
}

/// Blueprint of a type by full name
pub fn materialize_by_name(engine: &mut Engine, name: &str) -> BridgeResult<Rc<Blueprint>> {
    let node = engine.bridge().node(name)?;
    materialize(engine, node.tree_node())
}

fn build(engine: &mut Engine, tree_node: TreeNodeId) -> BridgeResult<Rc<Blueprint>> {
    let started = Instant::now();
    let bridge = engine.bridge().clone();
    let reader = bridge.reader();
    let node = bridge.node_for_tree(tree_node)?;

    let (base, skipped) = usable_base(engine, &node)?;
    let base = match base {
        Some(base) => Some(materialize(engine, base)?),
        None => None,
    };

    let simple_name = reader.name(tree_node);
    let callback = if node.is_interface() {
        NativeCallback::InterfaceConstructor(node.clone())
    } else {
        NativeCallback::ClassConstructor(node.clone())
    };
    let (constructor, prototype) = engine.new_constructor(&simple_name, callback);
    if let Some(base) = &base {
        engine.set_prototype(prototype, Some(base.prototype))?;
    }

    let members = reader.members(tree_node)?;
    let skipped_members = skipped
        .iter()
        .map(|id| reader.members(*id))
        .collect::<Result<Vec<TypeMembers>, _>>()?;
    let mut methods = base.as_ref().map(|b| b.methods.clone()).unwrap_or_default();
    let own = members::install_instance_members(engine, &node, prototype, &members, &skipped_members, &methods)?;
    methods.extend(own);

    let constructor = profiler::wrap(engine, constructor, &simple_name, true);
    members::install_static_members(engine, &node, constructor, &members)?;
    install_constructor_extras(engine, &node, constructor);
    if let Some(base) = &base {
        engine.set_prototype(constructor, Some(base.constructor))?;
    }
    engine.set_private(
        constructor,
        PrivateKey::TypeMetadata,
        PrivateValue::TypeName(Arc::from(node.name())),
    );
    node.set_constructor(engine.id(), constructor);

    let blueprint = Rc::new(Blueprint {
        node: node.clone(),
        constructor,
        prototype,
        methods,
    });
    let cache = engine.cache_mut();
    cache.blueprints.insert(tree_node, blueprint.clone());
    cache.stats.blueprints_built += 1;

    // Nested types become properties of the outer constructor
    for child in reader.children(tree_node) {
        if !reader.kind(child).is_type() {
            continue;
        }
        let inner = materialize(engine, child)?;
        let child_name = reader.name(child);
        engine.define_data(constructor, &*child_name, Value::Object(inner.constructor));
    }

    tracing::debug!(
        class = node.name(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "Materializing class"
    );
    Ok(blueprint)
}

/// Nearest declared base present in the runtime hierarchy, plus the skipped bases
fn usable_base(engine: &Engine, node: &MetadataNode) -> BridgeResult<(Option<TreeNodeId>, Vec<TreeNodeId>)> {
    let bridge = engine.bridge();
    let reader = bridge.reader();
    let runtime = bridge.runtime();
    let tree_node = node.tree_node();

    let mut base = reader.base_class_node(tree_node)?;
    let mut skipped = Vec::new();

    if let Some(class) = runtime.find_class(node.name()) {
        while let Some(candidate) = base {
            if candidate == tree_node || candidate == reader.root() || !reader.kind(candidate).is_type() {
                break;
            }
            let base_name = reader.read_type_name(candidate);
            match runtime.find_class(&base_name) {
                Some(base_class) if !runtime.is_assignable_from(class, base_class) => {
                    tracing::debug!(class = node.name(), skipped = %base_name, "Skipping base missing from runtime hierarchy");
                    skipped.push(candidate);
                    base = reader.base_class_node(candidate)?;
                }
                _ => break,
            }
        }
    }

    let base = base.filter(|b| *b != tree_node && *b != reader.root());
    Ok((base, skipped))
}

fn install_constructor_extras(engine: &mut Engine, node: &Arc<MetadataNode>, constructor: ObjectId) {
    let extend = engine.new_native_function("extend", NativeCallback::Extend(node.clone()));
    engine.define_data(constructor, "extend", Value::Object(extend));
    engine.define_accessor(constructor, "class", Accessor::ClassObject);
    engine.define_accessor(constructor, "null", Accessor::NullObject(node.clone()));
}
