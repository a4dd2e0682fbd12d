//! Foreign runtime interface
//!
//! The binding engine never talks to the foreign runtime directly. Everything
//! it needs (class lookup, instance registration, member access, array
//! access, and class synthesis for `extend`) goes through
//! [`ForeignRuntime`], which the embedder implements. Calls carry the engine
//! so that implementations can create script values in the right instance.

use ferrobind_metadata::MetadataEntry;

use crate::engine::{Engine, ObjectId, Value};
use crate::error::BridgeResult;

/// Opaque handle to a class in the foreign runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassRef(pub u64);

/// Request to synthesize (or look up) the class backing an `extend` call
pub struct ClassResolution<'a> {
    /// Engine performing the call
    pub engine: &'a mut Engine,
    /// Name of the type being extended
    pub base_class_name: &'a str,
    /// Synthesized class name
    pub full_class_name: &'a str,
    /// Script implementation object
    pub implementation: ObjectId,
    /// The extended type is an interface
    pub is_interface: bool,
}

/// Request to create and link the foreign peer of a new script instance
pub struct InstanceRegistration<'a> {
    /// Engine performing the call
    pub engine: &'a mut Engine,
    /// Newly constructed script object
    pub object: ObjectId,
    /// Class to instantiate
    pub class_name: &'a str,
    /// Constructor arguments
    pub args: &'a [Value],
    /// Script implementation object, for interface and extended classes
    pub implementation: Option<ObjectId>,
    /// The instance implements an interface
    pub is_interface: bool,
    /// Name of the extended base type, for extended classes
    pub base_class_name: Option<&'a str>,
}

/// Field read or write
pub struct FieldAccess<'a> {
    /// Engine performing the call
    pub engine: &'a mut Engine,
    /// Receiver, or `None` for static fields
    pub target: Option<ObjectId>,
    /// Type declaring the field
    pub declaring_type: &'a str,
    /// Field metadata
    pub entry: &'a MetadataEntry,
}

/// Resolved method invocation
pub struct MethodCall<'a> {
    /// Engine performing the call
    pub engine: &'a mut Engine,
    /// Receiver (the constructor for static calls)
    pub this: Value,
    /// Declaring class of the selected overload
    pub class_name: &'a str,
    /// Method name
    pub method_name: &'a str,
    /// Selected overload
    pub entry: &'a MetadataEntry,
    /// The method was resolved on an interface
    pub is_from_interface: bool,
    /// Static call
    pub is_static: bool,
    /// Bypass script overrides and call the foreign implementation
    pub is_super: bool,
    /// Call arguments
    pub args: &'a [Value],
}

/// Element access on a foreign array
pub struct ArrayAccess<'a> {
    /// Engine performing the call
    pub engine: &'a mut Engine,
    /// Script proxy of the array
    pub array: ObjectId,
    /// Array type name, e.g. `[I`
    pub array_type: &'a str,
    /// Element index
    pub index: u32,
}

/// The foreign runtime the engine binds to
pub trait ForeignRuntime: Send + Sync {
    // ========================================================================
    // Classes
    // ========================================================================

    /// Look up a class by slash-separated name
    fn find_class(&self, name: &str) -> Option<ClassRef>;

    /// True if `class` can be assigned to `base`
    fn is_assignable_from(&self, class: ClassRef, base: ClassRef) -> bool;

    /// Script value of the runtime's class object for `class_name`
    fn class_object(&self, engine: &mut Engine, class_name: &str) -> BridgeResult<Value>;

    /// Synthesize or find the class backing an `extend` call
    fn resolve_class(&self, request: ClassResolution<'_>) -> BridgeResult<ClassRef>;

    /// Canonical name of a class
    fn class_name(&self, class: ClassRef) -> String;

    // ========================================================================
    // Instances
    // ========================================================================

    /// Create the foreign peer of a new script instance and link the two
    fn register_instance(&self, request: InstanceRegistration<'_>) -> BridgeResult<()>;

    /// True if the script object has a foreign peer
    fn has_foreign_object(&self, engine: &Engine, object: ObjectId) -> bool;

    /// True if the foreign peer of `object` is an instance of `class`
    fn is_instance_of(&self, engine: &Engine, object: ObjectId, class: ClassRef) -> bool;

    /// Make `view` resolve to the same foreign peer as `source`
    fn link_identity(&self, engine: &mut Engine, source: ObjectId, view: ObjectId);

    // ========================================================================
    // Members
    // ========================================================================

    /// Read a field
    fn get_field(&self, access: FieldAccess<'_>) -> BridgeResult<Value>;

    /// Write a field
    fn set_field(&self, access: FieldAccess<'_>, value: Value) -> BridgeResult<()>;

    /// Invoke a method
    fn call_method(&self, call: MethodCall<'_>) -> BridgeResult<Value>;

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Element count
    fn array_length(&self, engine: &mut Engine, array: ObjectId) -> BridgeResult<usize>;

    /// Read an element
    fn array_get(&self, access: ArrayAccess<'_>) -> BridgeResult<Value>;

    /// Write an element
    fn array_set(&self, access: ArrayAccess<'_>, value: Value) -> BridgeResult<()>;

    // ========================================================================
    // Lazy metadata
    // ========================================================================

    /// Inline metadata for a type missing from the precompiled tree
    fn type_metadata(&self, _name: &str) -> Option<String> {
        None
    }
}
