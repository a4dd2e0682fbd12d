//! Shared fixtures for unit tests

use std::sync::Arc;

use ferrobind_metadata::{MetadataBuffers, MetadataWriter, TypeDef};

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::engine::{Engine, ObjectId, Value};
use crate::error::BridgeResult;
use crate::foreign::{ArrayAccess, ClassRef, ClassResolution, FieldAccess, ForeignRuntime, InstanceRegistration, MethodCall};

/// Metadata holding only `java/lang/Object`
pub(crate) fn empty_buffers() -> MetadataBuffers {
    let mut writer = MetadataWriter::new();
    writer.add_type("java/lang/Object", TypeDef::class().method("hashCode", "()I", 0));
    writer.finish().unwrap()
}

/// Runtime that knows no classes and answers every call with `undefined`
pub(crate) struct NullRuntime;

impl ForeignRuntime for NullRuntime {
    fn find_class(&self, _name: &str) -> Option<ClassRef> {
        None
    }

    fn is_assignable_from(&self, _class: ClassRef, _base: ClassRef) -> bool {
        true
    }

    fn class_object(&self, _engine: &mut Engine, _class_name: &str) -> BridgeResult<Value> {
        Ok(Value::Undefined)
    }

    fn resolve_class(&self, _request: ClassResolution<'_>) -> BridgeResult<ClassRef> {
        Ok(ClassRef(0))
    }

    fn class_name(&self, _class: ClassRef) -> String {
        String::new()
    }

    fn register_instance(&self, _request: InstanceRegistration<'_>) -> BridgeResult<()> {
        Ok(())
    }

    fn has_foreign_object(&self, _engine: &Engine, _object: ObjectId) -> bool {
        false
    }

    fn is_instance_of(&self, _engine: &Engine, _object: ObjectId, _class: ClassRef) -> bool {
        false
    }

    fn link_identity(&self, _engine: &mut Engine, _source: ObjectId, _view: ObjectId) {}

    fn get_field(&self, _access: FieldAccess<'_>) -> BridgeResult<Value> {
        Ok(Value::Undefined)
    }

    fn set_field(&self, _access: FieldAccess<'_>, _value: Value) -> BridgeResult<()> {
        Ok(())
    }

    fn call_method(&self, _call: MethodCall<'_>) -> BridgeResult<Value> {
        Ok(Value::Undefined)
    }

    fn array_length(&self, _engine: &mut Engine, _array: ObjectId) -> BridgeResult<usize> {
        Ok(0)
    }

    fn array_get(&self, _access: ArrayAccess<'_>) -> BridgeResult<Value> {
        Ok(Value::Undefined)
    }

    fn array_set(&self, _access: ArrayAccess<'_>, _value: Value) -> BridgeResult<()> {
        Ok(())
    }
}

pub(crate) fn bridge_with_config(config: BridgeConfig) -> Arc<Bridge> {
    Bridge::new(empty_buffers(), Arc::new(NullRuntime), config).unwrap()
}

pub(crate) fn bridge_with_empty_metadata() -> Arc<Bridge> {
    bridge_with_config(BridgeConfig::default())
}
