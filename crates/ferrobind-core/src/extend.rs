//! Dynamic subclassing (`extend`)
//!
//! `Base.extend(impl)`, `Base.extend(name, impl)` and the three-argument form
//! emitted by TypeScript helpers synthesize a foreign subclass of `Base`
//! whose overridable methods are implemented by the script object `impl`.
//!
//! # Class names
//!
//! Without a dotted explicit name, the synthesized class name is
//!
//! ```text
//! <generated_class_prefix><base with $ replaced by _>_<file>_<line>_<column>_<name>
//! ```
//!
//! where the location is taken from the calling script frame. Repeated calls
//! from the same location therefore resolve to the same class, which is
//! created once per engine and then served from the engine's cache.
//!
//! # Prototype wiring
//!
//! Instances chain to the synthesized prototype, then to `impl`, then to the
//! base prototype. `impl` also gains a `super` accessor returning a view of
//! the instance whose lookups start at the base prototype.

use std::rc::Rc;
use std::sync::Arc;

use crate::engine::{Accessor, Engine, NativeCallback, ObjectId, PrivateKey, PrivateValue, Value};
use crate::error::{BridgeError, BridgeResult};
use crate::foreign::{ClassResolution, InstanceRegistration};
use crate::lifecycle::ExtendedClass;
use crate::materialize::materialize;
use crate::node::MetadataNode;
use crate::proxy::{self, instance_metadata};

/// Stack depth of the user frame when called through TypeScript's `__extends` helper
const TYPESCRIPT_FRAME_DEPTH: usize = 2;

/// Own property marking an object whose `prototype` is its implementation object
const PROTOTYPE_IMPLEMENTATION_MARKER: &str = "__isPrototypeImplementationObject";

/// Data carried by the constructor of a synthesized class
#[derive(Debug)]
pub struct ExtendedClassData {
    /// Node of the extended base type
    pub node: Arc<MetadataNode>,
    /// Location fingerprint followed by the explicit name
    pub extend_name_and_location: String,
    /// Script implementation object
    pub implementation: ObjectId,
    /// Synthesized class name
    pub full_class_name: String,
}

/// The `extend` function installed on every constructor
pub(crate) fn extend(engine: &mut Engine, node: &Arc<MetadataNode>, args: &[Value], is_construct: bool) -> BridgeResult<Value> {
    if is_construct {
        return Err(BridgeError::usage("Can't call 'extend' as constructor"));
    }

    let mut dotted = None;
    let mut is_typescript = false;
    match args {
        [name, implementation] => {
            let Value::String(name) = name else {
                return Err(BridgeError::usage(
                    "Invalid extend() call. No name for extend specified at location: ",
                ));
            };
            let Value::Object(implementation) = implementation else {
                return Err(BridgeError::usage(
                    "Invalid extend() call. Named extend should be called with second object parameter containing overridden methods at location: ",
                ));
            };
            if name.contains('.') {
                dotted = Some((name.to_string(), *implementation));
            }
        }
        [_, _, Value::Bool(true)] => is_typescript = true,
        _ => {}
    }

    let (name_and_location, full_class_name, implementation) = match dotted {
        Some((name, implementation)) => (name.clone(), name, implementation),
        None => {
            let (location, location_is_valid) = extend_location(engine, is_typescript);
            let (name, implementation) = validate_extend_arguments(args, location_is_valid, &location, is_typescript)?;
            let name_and_location = format!("{location}{name}");
            let full_class_name = format!(
                "{}{}",
                engine.bridge().config().generated_class_prefix,
                full_class_name(node.name(), &name_and_location)
            );
            (name_and_location, full_class_name, implementation)
        }
    };

    let runtime = engine.bridge().runtime().clone();
    let class = runtime.resolve_class(ClassResolution {
        engine,
        base_class_name: node.name(),
        full_class_name: &full_class_name,
        implementation,
        is_interface: node.is_interface(),
    })?;
    let extended_name = runtime.class_name(class);

    if let Some(cached) = engine.cache().extended_class(&extended_name) {
        return Ok(Value::Object(cached.constructor));
    }

    if let Some(PrivateValue::TypeName(used)) = engine.private(implementation, &PrivateKey::ClassImplementationObject) {
        return Err(BridgeError::usage(format!(
            "This object is used to extend another class '{used}'"
        )));
    }

    let base = materialize(engine, node.tree_node())?;
    let data = Rc::new(ExtendedClassData {
        node: node.clone(),
        extend_name_and_location: name_and_location,
        implementation,
        full_class_name: extended_name.clone(),
    });
    let simple_name = extended_name.rsplit('/').next().unwrap_or(&extended_name);
    let (constructor, prototype) = engine.new_constructor(simple_name, NativeCallback::ExtendedConstructor(data));

    engine.set_prototype(implementation, Some(base.prototype))?;
    engine.define_accessor(implementation, "super", Accessor::Super);
    engine.set_prototype(prototype, Some(implementation))?;
    engine.set_prototype(constructor, Some(base.constructor))?;
    engine.define_accessor(constructor, "class", Accessor::ClassObject);
    engine.set_private(
        constructor,
        PrivateKey::TypeMetadata,
        PrivateValue::TypeName(Arc::from(extended_name.as_str())),
    );

    // A failed extend must leave the implementation object unmarked
    engine.set_private(
        implementation,
        PrivateKey::ClassImplementationObject,
        PrivateValue::TypeName(Arc::from(extended_name.as_str())),
    );
    engine.bridge().registry().register_alias(&extended_name, node.clone());
    let cache = engine.cache_mut();
    cache.extended_classes.insert(
        extended_name.clone(),
        ExtendedClass {
            constructor,
            name: extended_name.clone(),
            node: node.clone(),
        },
    );
    cache.stats.extended_classes_created += 1;

    tracing::debug!(base = node.name(), class = %extended_name, "Extending");
    Ok(Value::Object(constructor))
}

fn full_class_name(base_class_name: &str, name_and_location: &str) -> String {
    if name_and_location.is_empty() {
        return base_class_name.to_string();
    }
    format!("{}_{}", base_class_name.replace('$', "_"), name_and_location)
}

/// True if `name` only contains `[a-zA-Z0-9_]`
fn is_valid_extend_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_extend_arguments(
    args: &[Value],
    location_is_valid: bool,
    location: &str,
    is_typescript: bool,
) -> BridgeResult<(String, ObjectId)> {
    if args.len() == 1 {
        if !location_is_valid {
            return Err(BridgeError::usage(format!(
                "Invalid extend() call. No name specified for extend at location: {location}"
            )));
        }
        return match &args[0] {
            Value::Object(implementation) => Ok((String::new(), *implementation)),
            _ => Err(BridgeError::usage(format!(
                "Invalid extend() call. No implementation object specified at location: {location}"
            ))),
        };
    }

    if args.len() == 2 || is_typescript {
        let Value::String(name) = &args[0] else {
            return Err(BridgeError::usage(format!(
                "Invalid extend() call. No name for extend specified at location: {location}"
            )));
        };
        let Value::Object(implementation) = &args[1] else {
            return Err(BridgeError::usage(format!(
                "Invalid extend() call. Named extend should be called with second object parameter containing overridden methods at location: {location}"
            )));
        };
        if !is_valid_extend_name(name) {
            return Err(BridgeError::usage(format!(
                "The extend name \"{name}\" you provided contains invalid symbols. Try using the symbols [a-z, A-Z, 0-9, _]."
            )));
        }
        return Ok((name.to_string(), *implementation));
    }

    Err(BridgeError::usage(format!("Invalid extend() call at location: {location}")))
}

/// Location fingerprint `file_line_column_` of the calling script frame
///
/// The flag is false when the frame lacks a line or column, in which case the
/// string describes what is missing.
pub fn extend_location(engine: &Engine, is_typescript: bool) -> (String, bool) {
    let depth = if is_typescript { TYPESCRIPT_FRAME_DEPTH } else { 0 };
    let Some(frame) = engine.stack_frame(depth) else {
        return (String::new(), true);
    };
    let Some(script_name) = frame.script_name.as_deref() else {
        return ("unknown_location".to_string(), true);
    };

    let config = engine.bridge().config();
    let script_name = script_name.replace("file://", "");
    let file = if script_name == "<embedded>" {
        "script".to_string()
    } else {
        let relative = script_name.strip_prefix(config.app_root.as_str()).unwrap_or(&script_name);
        let relative = relative.strip_suffix(".js").unwrap_or(relative);
        let sanitized: String = relative
            .chars()
            .map(|c| if matches!(c, '/' | '.' | '-' | ' ') { '_' } else { c })
            .collect();
        sanitized.rsplit('_').next().unwrap_or_default().to_string()
    };

    if frame.line < 0 {
        return (format!("{file} unknown line number"), false);
    }
    let mut column = frame.column;
    if column < 0 {
        return (format!("{file} line:{} unknown column number", frame.line), false);
    }
    if frame.line == 1 {
        column -= config.module_prologue_length;
    }
    (format!("{file}_{}_{column}_", frame.line), true)
}

/// Constructor callback of a synthesized class
pub(crate) fn extended_constructor(
    engine: &mut Engine,
    data: &ExtendedClassData,
    this: Value,
    args: &[Value],
    is_construct: bool,
) -> BridgeResult<Value> {
    if !is_construct {
        return Err(BridgeError::usage(
            "Incorrectly calling a Java class as a method. Class must be created by invoking its constructor with the `new` keyword.",
        ));
    }
    let object = proxy::construct_target(&this)?;
    proxy::set_instance_metadata(engine, object, &data.node);
    engine.set_call_super(object, true);
    engine.set_private(
        object,
        PrivateKey::ImplementationObject,
        PrivateValue::Value(Value::Object(data.implementation)),
    );

    let runtime = engine.bridge().runtime().clone();
    runtime.register_instance(InstanceRegistration {
        engine,
        object,
        class_name: &data.full_class_name,
        args,
        implementation: Some(data.implementation),
        is_interface: false,
        base_class_name: Some(data.node.name()),
    })?;
    Ok(this)
}

/// The `super` accessor of implementation objects
///
/// `receiver` must be a direct instance of a synthesized class: the base
/// prototype is taken three links up its chain, so a further script-level
/// subclass of that class would get a view over the wrong prototype.
pub(crate) fn super_value(engine: &mut Engine, receiver: ObjectId) -> BridgeResult<Value> {
    if let Some(PrivateValue::Value(cached)) = engine.private(receiver, &PrivateKey::SuperValue) {
        return Ok(cached.clone());
    }

    // receiver -> synthesized prototype -> implementation -> base prototype
    let base_prototype = engine
        .prototype_of(receiver)
        .and_then(|p| engine.prototype_of(p))
        .and_then(|p| engine.prototype_of(p));
    let view = engine.new_object_with_prototype(base_prototype);
    engine.set_call_super(view, true);

    let value = Value::Object(view);
    engine.set_private(receiver, PrivateKey::SuperValue, PrivateValue::Value(value.clone()));
    let runtime = engine.bridge().runtime().clone();
    runtime.link_identity(engine, receiver, view);
    if let Some(node) = instance_metadata(engine, receiver) {
        proxy::set_instance_metadata(engine, view, &node);
    }
    Ok(value)
}

/// Script implementation object backing `object`, if any
pub fn implementation_object(engine: &Engine, object: ObjectId) -> Option<ObjectId> {
    if let Some(PrivateValue::Value(Value::Object(implementation))) =
        engine.private(object, &PrivateKey::ImplementationObject)
    {
        return Some(*implementation);
    }

    if engine.has_own_property(object, PROTOTYPE_IMPLEMENTATION_MARKER) {
        return engine.own_data(object, "prototype").and_then(|p| p.as_object());
    }

    if let Some(PrivateValue::Value(Value::Object(activity))) =
        engine.private(object, &PrivateKey::ActivityImplementationObject)
    {
        return Some(*activity);
    }

    let mut last = None;
    let mut current = engine.prototype_of(object);
    for _ in 0..engine.heap_size() {
        let prototype = current?;
        if last == Some(prototype) {
            return None;
        }
        if engine.private(prototype, &PrivateKey::ClassImplementationObject).is_some() {
            return Some(prototype);
        }
        last = Some(prototype);
        current = engine.prototype_of(prototype);
    }
    None
}
