//! Instance, array and package proxies
//!
//! Proxies are the script objects that stand for foreign entities: instances
//! of foreign classes, foreign arrays, and packages. Each one carries a hidden
//! identity tag naming its MetadataNode.
//!
//! Package objects expose one lazy accessor per child. The first read of a
//! child materializes its wrapper and memoizes it in a hidden slot of the
//! package object.

use std::rc::Rc;
use std::sync::Arc;

use ferrobind_metadata::NodeKind;

use crate::engine::{
    Accessor, Engine, IndexedHandler, NativeCallback, ObjectId, ObjectTemplate, PrivateKey, PrivateValue,
    PropertyKey, Value,
};
use crate::error::{BridgeError, BridgeResult};
use crate::foreign::{ArrayAccess, ClassRef, InstanceRegistration};
use crate::materialize::{materialize, materialize_by_name};
use crate::node::MetadataNode;

// ============================================================================
// Wrappers
// ============================================================================

/// Script wrapper of a node: a constructor for types, an object for packages
pub fn create_wrapper(engine: &mut Engine, node: &Arc<MetadataNode>) -> BridgeResult<ObjectId> {
    match node.kind() {
        NodeKind::Class | NodeKind::Interface => Ok(materialize(engine, node.tree_node())?.constructor),
        NodeKind::Package => Ok(create_package_object(engine, node)),
        kind => Err(BridgeError::internal(format!(
            "Can't create proxy for this type={}",
            kind.as_u8()
        ))),
    }
}

/// Proxy for an existing foreign instance (or array) of type `node`
pub fn create_js_wrapper(engine: &mut Engine, node: &Arc<MetadataNode>) -> BridgeResult<ObjectId> {
    let object = if node.is_array() {
        let root_class = engine.bridge().config().root_class_name.clone();
        let root = materialize_by_name(engine, &root_class)?;
        let template = array_template(engine);
        engine.new_object_from_template(&template, Some(root.prototype))
    } else {
        let blueprint = materialize(engine, node.tree_node())?;
        let object = engine.new_object_with_prototype(Some(blueprint.prototype));
        engine.define_data(object, "constructor", Value::Object(blueprint.constructor));
        object
    };
    set_instance_metadata(engine, object, node);
    Ok(object)
}

/// Proxy for an instance of a class synthesized by `extend` in this engine
///
/// Returns `None` if no such class was created in this engine.
pub fn create_extended_js_wrapper(engine: &mut Engine, class_name: &str) -> BridgeResult<Option<ObjectId>> {
    let Some(extended) = engine.cache().extended_class(class_name).cloned() else {
        return Ok(None);
    };
    let prototype = engine.get(extended.constructor, "prototype")?.as_object();
    let object = engine.new_object_with_prototype(prototype);
    engine.set_call_super(object, true);
    set_instance_metadata(engine, object, &extended.node);
    Ok(Some(object))
}

fn array_template(engine: &mut Engine) -> Rc<ObjectTemplate> {
    if let Some(template) = &engine.cache().array_template {
        return template.clone();
    }
    let template = Rc::new(ObjectTemplate {
        indexed: Some(IndexedHandler::ForeignArray),
        accessors: vec![(PropertyKey::from("length"), Accessor::ArrayLength)],
    });
    engine.cache_mut().array_template = Some(template.clone());
    template
}

// ============================================================================
// Identity
// ============================================================================

pub(crate) fn set_instance_metadata(engine: &mut Engine, object: ObjectId, node: &Arc<MetadataNode>) {
    engine.set_private(object, PrivateKey::Metadata, PrivateValue::Node(node.clone()));
}

/// MetadataNode an object is tagged with
pub fn instance_metadata(engine: &Engine, object: ObjectId) -> Option<Arc<MetadataNode>> {
    match engine.private(object, &PrivateKey::Metadata)? {
        PrivateValue::Node(node) => Some(node.clone()),
        _ => None,
    }
}

/// Canonical type name of a constructor
pub fn type_metadata_name(engine: &Engine, constructor: ObjectId) -> Option<Arc<str>> {
    match engine.private(constructor, &PrivateKey::TypeMetadata)? {
        PrivateValue::TypeName(name) => Some(name.clone()),
        _ => None,
    }
}

// ============================================================================
// Packages
// ============================================================================

fn create_package_object(engine: &mut Engine, node: &Arc<MetadataNode>) -> ObjectId {
    let bridge = engine.bridge().clone();
    let reader = bridge.reader();
    let package = engine.new_object();
    for child in reader.children(node.tree_node()) {
        if reader.kind(child) == NodeKind::ArrayMarker {
            continue;
        }
        engine.define_accessor(package, reader.name(child), Accessor::PackageChild);
    }
    set_instance_metadata(engine, package, node);
    package
}

/// Resolve the child `name` of a package object
///
/// The wrapper is memoized on the package object. A name with no matching
/// child yields `undefined` and is not memoized.
pub fn resolve_package_child(engine: &mut Engine, package: ObjectId, name: &str) -> BridgeResult<Value> {
    let key = PrivateKey::PackageChild(Arc::from(name));
    if let Some(PrivateValue::Value(cached)) = engine.private(package, &key) {
        return Ok(cached.clone());
    }

    let node = instance_metadata(engine, package)
        .ok_or_else(|| BridgeError::internal("package object has no metadata"))?;
    let bridge = engine.bridge().clone();
    let reader = bridge.reader();
    let Some(child) = reader.find_child(node.tree_node(), name) else {
        return Ok(Value::Undefined);
    };

    let child_node = bridge.node_for_tree(child)?;
    let wrapper = create_wrapper(engine, &child_node)?;

    if child_node.is_interface() {
        let class_name = reader.read_type_name(child);
        if let Some(class) = bridge.runtime().find_class(&class_name) {
            let hook = engine.new_native_function("[Symbol.hasInstance]", NativeCallback::HasInstance(class));
            engine.define_data(wrapper, PropertyKey::HasInstance, Value::Object(hook));
        }
    }

    tracing::debug!(package = node.name(), child = name, "Resolved package child");
    let value = Value::Object(wrapper);
    engine.set_private(package, key, PrivateValue::Value(value.clone()));
    Ok(value)
}

pub(crate) fn has_instance(engine: &mut Engine, class: ClassRef, args: &[Value]) -> BridgeResult<Value> {
    if args.len() != 1 {
        return Err(BridgeError::usage("Symbol.hasInstance must take exactly 1 argument"));
    }
    let Value::Object(object) = args[0] else {
        return Ok(Value::Bool(false));
    };
    let runtime = engine.bridge().runtime().clone();
    if !runtime.has_foreign_object(engine, object) {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(runtime.is_instance_of(engine, object, class)))
}

// ============================================================================
// Constructors
// ============================================================================

pub(crate) fn construct_target(this: &Value) -> BridgeResult<ObjectId> {
    this.as_object()
        .ok_or_else(|| BridgeError::internal("constructor called without a receiver object"))
}

pub(crate) fn class_constructor(
    engine: &mut Engine,
    node: &Arc<MetadataNode>,
    this: Value,
    args: &[Value],
    is_construct: bool,
) -> BridgeResult<Value> {
    if !is_construct {
        return Err(BridgeError::usage(format!(
            "Class constructor {} must be invoked with the `new` keyword",
            node.name()
        )));
    }
    let object = construct_target(&this)?;
    set_instance_metadata(engine, object, node);
    engine.set_call_super(object, true);

    let runtime = engine.bridge().runtime().clone();
    runtime.register_instance(InstanceRegistration {
        engine,
        object,
        class_name: node.name(),
        args,
        implementation: None,
        is_interface: false,
        base_class_name: Some(node.name()),
    })?;
    Ok(this)
}

pub(crate) fn interface_constructor(
    engine: &mut Engine,
    node: &Arc<MetadataNode>,
    this: Value,
    args: &[Value],
    is_construct: bool,
) -> BridgeResult<Value> {
    if !is_construct {
        return Err(BridgeError::usage(
            "Interface implementation must be invoked as a constructor with the `new` keyword.",
        ));
    }
    let implementation = match args {
        [Value::Object(implementation)] => *implementation,
        [_] => return Err(BridgeError::usage("First argument must be implementation object")),
        [Value::String(_), Value::Object(implementation)] => *implementation,
        [Value::String(_), _] => return Err(BridgeError::usage("Second argument must be implementation object")),
        [_, _] => return Err(BridgeError::usage("First argument must be string")),
        _ => return Err(BridgeError::usage("Invalid number of arguments")),
    };

    let object = construct_target(&this)?;
    set_instance_metadata(engine, object, node);
    engine.set_call_super(object, true);
    let prototype = engine.prototype_of(object);
    engine.set_prototype(implementation, prototype)?;
    engine.set_prototype(object, Some(implementation))?;
    engine.set_private(
        object,
        PrivateKey::ImplementationObject,
        PrivateValue::Value(Value::Object(implementation)),
    );

    let class_name = node.implementation_type().unwrap_or(node.name());
    let runtime = engine.bridge().runtime().clone();
    runtime.register_instance(InstanceRegistration {
        engine,
        object,
        class_name,
        args,
        implementation: Some(implementation),
        is_interface: true,
        base_class_name: None,
    })?;
    Ok(this)
}

// ============================================================================
// Constructor accessors
// ============================================================================

pub(crate) fn class_object(engine: &mut Engine, constructor: ObjectId) -> BridgeResult<Value> {
    let name = type_metadata_name(engine, constructor)
        .ok_or_else(|| BridgeError::internal("class accessor on an object without type metadata"))?;
    let runtime = engine.bridge().runtime().clone();
    runtime.class_object(engine, &name)
}

pub(crate) fn null_object(engine: &mut Engine, node: &Arc<MetadataNode>, constructor: ObjectId) -> BridgeResult<Value> {
    if let Some(PrivateValue::Value(cached)) = engine.private(constructor, &PrivateKey::NullObject) {
        return Ok(cached.clone());
    }
    let placeholder = engine.new_object_with_prototype(Some(constructor));
    let value_of = engine.new_native_function("valueOf", NativeCallback::NullValueOf);
    engine.define_data(placeholder, "valueOf", Value::Object(value_of));
    set_instance_metadata(engine, placeholder, node);

    let value = Value::Object(placeholder);
    engine.set_private(constructor, PrivateKey::NullObject, PrivateValue::Value(value.clone()));
    Ok(value)
}

// ============================================================================
// Arrays
// ============================================================================

fn array_type(engine: &Engine, array: ObjectId) -> BridgeResult<Arc<MetadataNode>> {
    instance_metadata(engine, array).ok_or_else(|| BridgeError::internal("array proxy has no metadata"))
}

pub(crate) fn array_length(engine: &mut Engine, array: ObjectId) -> BridgeResult<Value> {
    let runtime = engine.bridge().runtime().clone();
    let length = runtime.array_length(engine, array)?;
    Ok(Value::Number(length as f64))
}

pub(crate) fn array_get(engine: &mut Engine, array: ObjectId, index: u32) -> BridgeResult<Value> {
    let node = array_type(engine, array)?;
    let runtime = engine.bridge().runtime().clone();
    runtime.array_get(ArrayAccess {
        engine,
        array,
        array_type: node.name(),
        index,
    })
}

pub(crate) fn array_set(engine: &mut Engine, array: ObjectId, index: u32, value: Value) -> BridgeResult<()> {
    let node = array_type(engine, array)?;
    let runtime = engine.bridge().runtime().clone();
    runtime.array_set(
        ArrayAccess {
            engine,
            array,
            array_type: node.name(),
            index,
        },
        value,
    )
}
