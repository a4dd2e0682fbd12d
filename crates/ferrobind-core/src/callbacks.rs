//! Entry points called by the engine for native callbacks and accessors
//!
//! Every path from a script into the bridge passes through one of these
//! functions, and each runs under [`guard`] so a panic becomes a
//! [`BridgeError::Panic`](crate::error::BridgeError::Panic) instead of
//! unwinding into the engine.

use crate::engine::{Accessor, Engine, IndexedHandler, NativeCallback, ObjectId, PropertyKey, Value};
use crate::error::{guard, BridgeError, BridgeResult};
use crate::extend;
use crate::members;
use crate::profiler;
use crate::proxy;

/// Dispatch a native function call
pub(crate) fn invoke(
    engine: &mut Engine,
    callback: NativeCallback,
    this: Value,
    args: &[Value],
    is_construct: bool,
) -> BridgeResult<Value> {
    guard(|| match &callback {
        NativeCallback::Method(group) => members::invoke_method(engine, group, this, args),
        NativeCallback::ClassConstructor(node) => proxy::class_constructor(engine, node, this, args, is_construct),
        NativeCallback::InterfaceConstructor(node) => {
            proxy::interface_constructor(engine, node, this, args, is_construct)
        }
        NativeCallback::ExtendedConstructor(data) => {
            extend::extended_constructor(engine, data, this, args, is_construct)
        }
        NativeCallback::Extend(node) => extend::extend(engine, node, args, is_construct),
        NativeCallback::NullValueOf => Ok(Value::Null),
        NativeCallback::HasInstance(class) => proxy::has_instance(engine, *class, args),
        NativeCallback::Shim {
            target,
            is_constructor,
            origin,
        } => profiler::forward(engine, *target, *is_constructor, origin, this, args, is_construct),
    })
}

/// Dispatch an accessor read
pub(crate) fn accessor_get(
    engine: &mut Engine,
    accessor: &Accessor,
    receiver: ObjectId,
    holder: ObjectId,
    key: &PropertyKey,
) -> BridgeResult<Value> {
    guard(|| match accessor {
        Accessor::Field(field) => members::field_get(engine, field, receiver, holder),
        Accessor::Property(property) => members::property_get(engine, property, receiver),
        Accessor::ArrayLength => proxy::array_length(engine, receiver),
        Accessor::ClassObject => proxy::class_object(engine, receiver),
        Accessor::NullObject(node) => proxy::null_object(engine, node, receiver),
        Accessor::Super => extend::super_value(engine, receiver),
        Accessor::PackageChild => {
            let name = key
                .as_name()
                .ok_or_else(|| BridgeError::internal(format!("invalid package child key {key}")))?;
            proxy::resolve_package_child(engine, holder, name)
        }
    })
}

/// Dispatch an accessor write
pub(crate) fn accessor_set(
    engine: &mut Engine,
    accessor: &Accessor,
    receiver: ObjectId,
    holder: ObjectId,
    key: &PropertyKey,
    value: Value,
) -> BridgeResult<()> {
    guard(|| match accessor {
        Accessor::Field(field) => members::field_set(engine, field, receiver, holder, value),
        Accessor::Property(property) => members::property_set(engine, property, receiver, value),
        read_only => {
            debug_assert!(read_only.is_read_only());
            tracing::trace!(property = %key, "Ignoring write to read-only accessor");
            Ok(())
        }
    })
}

/// Dispatch an indexed element read
pub(crate) fn indexed_get(engine: &mut Engine, handler: IndexedHandler, target: ObjectId, index: u32) -> BridgeResult<Value> {
    guard(|| match handler {
        IndexedHandler::ForeignArray => proxy::array_get(engine, target, index),
    })
}

/// Dispatch an indexed element write
pub(crate) fn indexed_set(
    engine: &mut Engine,
    handler: IndexedHandler,
    target: ObjectId,
    index: u32,
    value: Value,
) -> BridgeResult<()> {
    guard(|| match handler {
        IndexedHandler::ForeignArray => proxy::array_set(engine, target, index, value),
    })
}
