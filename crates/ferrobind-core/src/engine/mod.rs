//! Engine instance object model
//!
//! This is the surface the binding engine needs from a scripting engine:
//! objects with prototype links, native accessors, hidden slots, callables
//! carrying tagged native callbacks, and the current script stack. One
//! [`Engine`] is one independent engine instance. It is single-threaded
//! (its callbacks hold `Rc` data) and owns its per-instance caches; the
//! process-wide state it shares with other instances lives in the
//! [`Bridge`].
//!
//! # Property lookup
//!
//! `get` walks the prototype chain; a data property yields its value, a
//! native accessor is invoked with both the receiver and the holder. `set`
//! invokes an accessor found anywhere on the chain and otherwise creates or
//! overwrites an own data property.
//!
//! # Disposal
//!
//! Dropping an engine (or calling [`Engine::dispose`]) releases its heap and
//! caches and purges its constructor handles from every MetadataNode.
//!
//! # Object handles
//!
//! An [`ObjectId`] is only meaningful to the engine that allocated it. The
//! fallible operations (`get`, `set`, calls, `set_prototype`, `instanceof`)
//! reject a handle outside the heap with [`BridgeError::Internal`]; the
//! infallible accessors panic on one.

pub mod object;
pub mod value;

use std::rc::Rc;
use std::sync::Arc;

pub use object::{
    Accessor, Callable, FunctionData, IndexedHandler, NativeCallback, ObjectData, ObjectTemplate, PrivateKey,
    PrivateValue, Property, PropertyKey, ScriptFn,
};
pub use value::{EngineId, ObjectId, Value};

use crate::bridge::Bridge;
use crate::callbacks;
use crate::error::{BridgeError, BridgeResult};
use crate::lifecycle::{self, InstanceCache};

/// One frame of the script call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Script file name, if known
    pub script_name: Option<String>,
    /// One-based line number; negative when unknown
    pub line: i32,
    /// One-based column number; negative when unknown
    pub column: i32,
}

impl StackFrame {
    /// Frame at a known source position
    pub fn new(script_name: &str, line: i32, column: i32) -> Self {
        Self {
            script_name: Some(script_name.to_string()),
            line,
            column,
        }
    }
}

/// An engine instance
pub struct Engine {
    id: EngineId,
    bridge: Arc<Bridge>,
    heap: Vec<ObjectData>,
    cache: InstanceCache,
    frames: Vec<StackFrame>,
}

impl Engine {
    /// Create an engine instance attached to `bridge`
    pub fn new(bridge: Arc<Bridge>) -> Self {
        let id = EngineId::new();
        tracing::debug!(engine = %id, "Created engine instance");
        Self {
            id,
            bridge,
            heap: Vec::new(),
            cache: InstanceCache::default(),
            frames: Vec::new(),
        }
    }

    /// Identifier of this instance
    pub fn id(&self) -> EngineId {
        self.id
    }

    /// Process-wide bridge state
    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    pub(crate) fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut InstanceCache {
        &mut self.cache
    }

    /// Counters of per-instance cache activity
    pub fn stats(&self) -> lifecycle::CacheStats {
        self.cache.stats
    }

    /// Tear down this instance
    pub fn dispose(self) {
        drop(self);
    }

    // ========================================================================
    // Objects
    // ========================================================================

    fn alloc(&mut self, data: ObjectData) -> ObjectId {
        let id = ObjectId(self.heap.len() as u32);
        self.heap.push(data);
        id
    }

    fn object(&self, id: ObjectId) -> &ObjectData {
        &self.heap[id.index()]
    }

    fn try_object(&self, id: ObjectId) -> BridgeResult<&ObjectData> {
        self.heap.get(id.index()).ok_or_else(|| {
            BridgeError::internal(format!("object {} does not belong to engine {}", id.as_u32(), self.id.as_u64()))
        })
    }

    fn object_mut(&mut self, id: ObjectId) -> &mut ObjectData {
        &mut self.heap[id.index()]
    }

    /// Number of live objects
    pub fn heap_size(&self) -> usize {
        self.heap.len()
    }

    /// Create an empty object with no prototype
    pub fn new_object(&mut self) -> ObjectId {
        self.alloc(ObjectData::default())
    }

    /// Create an empty object with the given prototype
    pub fn new_object_with_prototype(&mut self, prototype: Option<ObjectId>) -> ObjectId {
        self.alloc(ObjectData {
            prototype,
            ..ObjectData::default()
        })
    }

    /// Create an object from a template
    pub fn new_object_from_template(&mut self, template: &Rc<ObjectTemplate>, prototype: Option<ObjectId>) -> ObjectId {
        let id = self.new_object_with_prototype(prototype);
        for (key, accessor) in &template.accessors {
            self.define_accessor(id, key.clone(), accessor.clone());
        }
        self.object_mut(id).template = Some(template.clone());
        id
    }

    /// Create a function whose body is a script closure
    pub fn new_script_function<F>(&mut self, name: &str, body: F) -> ObjectId
    where
        F: Fn(&mut Engine, Value, &[Value]) -> BridgeResult<Value> + 'static,
    {
        self.new_function(name, Callable::Script(Rc::new(body)))
    }

    pub(crate) fn new_native_function(&mut self, name: &str, callback: NativeCallback) -> ObjectId {
        self.new_function(name, Callable::Native(callback))
    }

    /// Create a native constructor and its prototype object
    pub(crate) fn new_constructor(&mut self, name: &str, callback: NativeCallback) -> (ObjectId, ObjectId) {
        let ctor = self.new_native_function(name, callback);
        let prototype = self.new_object();
        self.define_data(prototype, "constructor", Value::Object(ctor));
        self.define_data(ctor, "prototype", Value::Object(prototype));
        (ctor, prototype)
    }

    fn new_function(&mut self, name: &str, callable: Callable) -> ObjectId {
        self.alloc(ObjectData {
            function: Some(FunctionData {
                name: Arc::from(name),
                callable,
            }),
            ..ObjectData::default()
        })
    }

    /// True if the object is callable
    pub fn is_function(&self, id: ObjectId) -> bool {
        self.object(id).function.is_some()
    }

    /// Name of a callable object
    pub fn function_name(&self, id: ObjectId) -> Option<Arc<str>> {
        self.object(id).function.as_ref().map(|f| f.name.clone())
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Define or overwrite an own data property
    pub fn define_data(&mut self, target: ObjectId, key: impl Into<PropertyKey>, value: Value) {
        self.object_mut(target)
            .properties
            .insert(key.into(), Property::Data(value));
    }

    pub(crate) fn define_accessor(&mut self, target: ObjectId, key: impl Into<PropertyKey>, accessor: Accessor) {
        self.object_mut(target)
            .properties
            .insert(key.into(), Property::Accessor(accessor));
    }

    /// True if `target` has an own property `key`
    pub fn has_own_property(&self, target: ObjectId, key: impl Into<PropertyKey>) -> bool {
        self.object(target).properties.contains_key(&key.into())
    }

    /// Own data value of `key`, without invoking accessors or walking the chain
    pub fn own_data(&self, target: ObjectId, key: impl Into<PropertyKey>) -> Option<Value> {
        match self.object(target).properties.get(&key.into())? {
            Property::Data(value) => Some(value.clone()),
            Property::Accessor(_) => None,
        }
    }

    /// Own string-named property keys
    pub fn own_keys(&self, target: ObjectId) -> Vec<Arc<str>> {
        let mut keys: Vec<Arc<str>> = self
            .object(target)
            .properties
            .keys()
            .filter_map(|key| match key {
                PropertyKey::Name(name) => Some(name.clone()),
                PropertyKey::HasInstance => None,
            })
            .collect();
        keys.sort();
        keys
    }

    /// Remove an own property
    pub fn delete(&mut self, target: ObjectId, key: impl Into<PropertyKey>) -> bool {
        self.object_mut(target).properties.remove(&key.into()).is_some()
    }

    fn lookup(&self, target: ObjectId, key: &PropertyKey) -> Option<(ObjectId, Property)> {
        let mut current = Some(target);
        // A chain can never be longer than the heap; set_prototype rejects cycles
        for _ in 0..=self.heap.len() {
            let id = current?;
            let object = self.object(id);
            if let Some(property) = object.properties.get(key) {
                return Some((id, property.clone()));
            }
            current = object.prototype;
        }
        None
    }

    /// Read a property, walking the prototype chain
    pub fn get(&mut self, target: ObjectId, key: impl Into<PropertyKey>) -> BridgeResult<Value> {
        self.try_object(target)?;
        let key = key.into();
        match self.lookup(target, &key) {
            None => Ok(Value::Undefined),
            Some((_, Property::Data(value))) => Ok(value),
            Some((holder, Property::Accessor(accessor))) => {
                callbacks::accessor_get(self, &accessor, target, holder, &key)
            }
        }
    }

    /// Write a property
    pub fn set(&mut self, target: ObjectId, key: impl Into<PropertyKey>, value: Value) -> BridgeResult<()> {
        self.try_object(target)?;
        let key = key.into();
        match self.lookup(target, &key) {
            Some((holder, Property::Accessor(accessor))) => {
                callbacks::accessor_set(self, &accessor, target, holder, &key, value)
            }
            _ => {
                self.object_mut(target)
                    .properties
                    .insert(key, Property::Data(value));
                Ok(())
            }
        }
    }

    /// Read an integer-indexed element
    pub fn get_index(&mut self, target: ObjectId, index: u32) -> BridgeResult<Value> {
        match self.try_object(target)?.template.as_ref().and_then(|t| t.indexed) {
            Some(handler) => callbacks::indexed_get(self, handler, target, index),
            None => self.get(target, index.to_string().as_str()),
        }
    }

    /// Write an integer-indexed element
    pub fn set_index(&mut self, target: ObjectId, index: u32, value: Value) -> BridgeResult<()> {
        match self.try_object(target)?.template.as_ref().and_then(|t| t.indexed) {
            Some(handler) => callbacks::indexed_set(self, handler, target, index, value),
            None => self.set(target, index.to_string().as_str(), value),
        }
    }

    // ========================================================================
    // Prototypes
    // ========================================================================

    /// Prototype of an object
    pub fn prototype_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.object(id).prototype
    }

    /// Replace the prototype of an object, rejecting cycles
    pub fn set_prototype(&mut self, id: ObjectId, prototype: Option<ObjectId>) -> BridgeResult<()> {
        self.try_object(id)?;
        let mut current = prototype;
        while let Some(p) = current {
            if p == id {
                return Err(BridgeError::usage("Cyclic __proto__ value"));
            }
            current = self.try_object(p)?.prototype;
        }
        self.object_mut(id).prototype = prototype;
        Ok(())
    }

    // ========================================================================
    // Hidden slots
    // ========================================================================

    pub(crate) fn private(&self, id: ObjectId, key: &PrivateKey) -> Option<&PrivateValue> {
        self.object(id).private.get(key)
    }

    pub(crate) fn set_private(&mut self, id: ObjectId, key: PrivateKey, value: PrivateValue) {
        self.object_mut(id).private.insert(key, value);
    }

    /// True if method calls on this object bypass script overrides
    pub fn call_super(&self, id: ObjectId) -> bool {
        self.object(id).call_super
    }

    pub(crate) fn set_call_super(&mut self, id: ObjectId, call_super: bool) {
        self.object_mut(id).call_super = call_super;
    }

    /// Record the activity implementation object of an instance
    pub fn set_activity_implementation(&mut self, id: ObjectId, implementation: ObjectId) {
        self.set_private(
            id,
            PrivateKey::ActivityImplementationObject,
            PrivateValue::Value(Value::Object(implementation)),
        );
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a function
    pub fn call(&mut self, function: ObjectId, this: Value, args: &[Value]) -> BridgeResult<Value> {
        self.invoke(function, this, args, false)
    }

    /// Invoke a function as a constructor
    pub fn construct(&mut self, function: ObjectId, args: &[Value]) -> BridgeResult<Value> {
        let prototype = self.get(function, "prototype")?.as_object();
        let this = self.new_object_with_prototype(prototype);
        let result = self.invoke(function, Value::Object(this), args, true)?;
        Ok(match result {
            Value::Object(_) => result,
            _ => Value::Object(this),
        })
    }

    /// Look up a method by name and call it with `target` as receiver
    pub fn call_method(&mut self, target: ObjectId, name: &str, args: &[Value]) -> BridgeResult<Value> {
        match self.get(target, name)? {
            Value::Object(function) if self.is_function(function) => {
                self.call(function, Value::Object(target), args)
            }
            _ => Err(BridgeError::usage(format!("{name} is not a function"))),
        }
    }

    pub(crate) fn invoke(&mut self, function: ObjectId, this: Value, args: &[Value], is_construct: bool) -> BridgeResult<Value> {
        let data = self
            .try_object(function)?
            .function
            .clone()
            .ok_or_else(|| BridgeError::usage("object is not a function"))?;
        match data.callable {
            Callable::Native(callback) => callbacks::invoke(self, callback, this, args, is_construct),
            Callable::Script(body) => body(self, this, args),
        }
    }

    /// The `instanceof` operator
    pub fn instance_of(&mut self, value: &Value, constructor: ObjectId) -> BridgeResult<bool> {
        self.try_object(constructor)?;
        if let Some((_, Property::Data(Value::Object(hook)))) = self.lookup(constructor, &PropertyKey::HasInstance) {
            let result = self.call(hook, Value::Object(constructor), std::slice::from_ref(value))?;
            return Ok(result.is_truthy());
        }

        let object = match value {
            Value::Object(id) => *id,
            _ => return Ok(false),
        };
        self.try_object(object)?;
        let prototype = match self.get(constructor, "prototype")? {
            Value::Object(p) => p,
            _ => return Err(BridgeError::usage("Function has non-object prototype in instanceof check")),
        };
        let mut current = self.prototype_of(object);
        while let Some(p) = current {
            if p == prototype {
                return Ok(true);
            }
            current = self.prototype_of(p);
        }
        Ok(false)
    }

    // ========================================================================
    // Script stack
    // ========================================================================

    /// Enter a script frame
    pub fn push_frame(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    /// Leave the innermost script frame
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Frame `depth` levels below the innermost one
    pub fn stack_frame(&self, depth: usize) -> Option<&StackFrame> {
        self.frames.iter().rev().nth(depth)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        lifecycle::on_dispose(self.id, &self.bridge);
    }
}
