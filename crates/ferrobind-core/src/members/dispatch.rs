//! Call-time dispatch of methods, fields and properties

use crate::engine::{Engine, ObjectId, Value};
use crate::error::{BridgeError, BridgeResult};
use crate::foreign::{FieldAccess, MethodCall};

use super::{FieldAccessor, MethodGroup, PropertyAccessor};

/// Default string coercion hook; answered without a foreign call
const VALUE_OF: &str = "valueOf";

/// Invoke the overload of `group` matching the argument count
pub(crate) fn invoke_method(engine: &mut Engine, group: &MethodGroup, this: Value, args: &[Value]) -> BridgeResult<Value> {
    let first = group
        .candidates()
        .first()
        .ok_or_else(|| BridgeError::internal(format!("empty method group '{}'", group.name())))?;
    let is_static = first.is_static;

    if args.is_empty() && first.name == VALUE_OF {
        return Ok(this);
    }

    let resolved = group.resolve(args.len()).ok_or_else(|| BridgeError::NoMatchingOverload {
        name: group.name().to_string(),
        args: args.len(),
    })?;

    let is_super = !is_static && this.as_object().is_some_and(|obj| engine.call_super(obj));
    let runtime = engine.bridge().runtime().clone();
    runtime.call_method(MethodCall {
        engine,
        this,
        class_name: resolved.class_name,
        method_name: &resolved.entry.name,
        entry: resolved.entry,
        is_from_interface: group.node().is_interface(),
        is_static,
        is_super,
        args,
    })
}

/// Read a field through its accessor
pub(crate) fn field_get(engine: &mut Engine, field: &FieldAccessor, receiver: ObjectId, holder: ObjectId) -> BridgeResult<Value> {
    let entry = &field.entry;
    if !entry.is_static && receiver == holder {
        // Read on the prototype itself, not on an instance
        return Ok(Value::Undefined);
    }
    let Some(declaring_type) = entry.declaring_type.as_deref() else {
        return Ok(Value::Undefined);
    };

    let runtime = engine.bridge().runtime().clone();
    runtime.get_field(FieldAccess {
        engine,
        target: (!entry.is_static).then_some(receiver),
        declaring_type,
        entry,
    })
}

/// Write a field through its accessor
pub(crate) fn field_set(
    engine: &mut Engine,
    field: &FieldAccessor,
    receiver: ObjectId,
    holder: ObjectId,
    value: Value,
) -> BridgeResult<()> {
    let entry = &field.entry;
    if !entry.is_static && receiver == holder {
        return Ok(());
    }
    if entry.is_final {
        return Err(BridgeError::usage(format!(
            "You are trying to set \"{}\" which is a final field! Final fields can only be read.",
            entry.name
        )));
    }
    let Some(declaring_type) = entry.declaring_type.as_deref() else {
        return Ok(());
    };

    let runtime = engine.bridge().runtime().clone();
    runtime.set_field(
        FieldAccess {
            engine,
            target: (!entry.is_static).then_some(receiver),
            declaring_type,
            entry,
        },
        value,
    )
}

/// Read a property by calling its getter method on the receiver
pub(crate) fn property_get(engine: &mut Engine, property: &PropertyAccessor, receiver: ObjectId) -> BridgeResult<Value> {
    let getter = property
        .getter_name
        .as_deref()
        .ok_or_else(|| BridgeError::usage(format!("Missing getter method for property: {}", property.name)))?;
    engine.call_method(receiver, getter, &[])
}

/// Write a property by calling its setter method on the receiver
pub(crate) fn property_set(
    engine: &mut Engine,
    property: &PropertyAccessor,
    receiver: ObjectId,
    value: Value,
) -> BridgeResult<()> {
    let setter = property
        .setter_name
        .as_deref()
        .ok_or_else(|| BridgeError::usage(format!("Missing setter method for property: {}", property.name)))?;
    engine.call_method(receiver, setter, &[value])?;
    Ok(())
}
