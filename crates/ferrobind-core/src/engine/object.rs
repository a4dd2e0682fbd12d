//! Heap objects, properties and native callback tags

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{Engine, ObjectId, Value};
use crate::error::BridgeResult;
use crate::extend::ExtendedClassData;
use crate::foreign::ClassRef;
use crate::members::{FieldAccessor, MethodGroup, PropertyAccessor};
use crate::node::MetadataNode;

/// Property key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String-named property
    Name(Arc<str>),
    /// The well-known has-instance symbol consulted by `instanceof`
    HasInstance,
}

impl PropertyKey {
    /// Property name, if string-named
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PropertyKey::Name(name) => Some(name),
            PropertyKey::HasInstance => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::Name(Arc::from(name))
    }
}

impl From<Arc<str>> for PropertyKey {
    fn from(name: Arc<str>) -> Self {
        PropertyKey::Name(name)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Name(name) => f.write_str(name),
            PropertyKey::HasInstance => f.write_str("Symbol.hasInstance"),
        }
    }
}

/// Native accessor attached to an object
///
/// The getter and setter receive both the receiver (`this`) and the holder
/// (the object on the prototype chain that owns the accessor).
#[derive(Clone)]
pub enum Accessor {
    /// Foreign instance or static field
    Field(Rc<FieldAccessor>),
    /// Getter/setter method pair
    Property(Rc<PropertyAccessor>),
    /// `length` of a foreign array
    ArrayLength,
    /// `class` on constructors
    ClassObject,
    /// `null` on constructors
    NullObject(Arc<MetadataNode>),
    /// `super` on implementation objects
    Super,
    /// Lazily resolved package child
    PackageChild,
}

impl Accessor {
    /// Accessors without a setter ignore assignment
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Accessor::ArrayLength | Accessor::ClassObject | Accessor::NullObject(_) | Accessor::Super | Accessor::PackageChild
        )
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(field) => write!(f, "Field({})", field.entry.name),
            Accessor::Property(prop) => write!(f, "Property({})", prop.name),
            Accessor::ArrayLength => f.write_str("ArrayLength"),
            Accessor::ClassObject => f.write_str("ClassObject"),
            Accessor::NullObject(node) => write!(f, "NullObject({})", node.name()),
            Accessor::Super => f.write_str("Super"),
            Accessor::PackageChild => f.write_str("PackageChild"),
        }
    }
}

/// Own property
#[derive(Debug, Clone)]
pub enum Property {
    /// Plain value
    Data(Value),
    /// Native accessor
    Accessor(Accessor),
}

/// Key of a hidden slot, invisible to scripts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrivateKey {
    /// Identity tag: the object's MetadataNode
    Metadata,
    /// Canonical type name of a constructor
    TypeMetadata,
    /// Implementation object backing an instance
    ImplementationObject,
    /// Synthesized class name an implementation object is bound to
    ClassImplementationObject,
    /// Implementation object recorded by activity bootstrapping
    ActivityImplementationObject,
    /// Cached `super` view of an instance
    SuperValue,
    /// Cached null placeholder of a constructor
    NullObject,
    /// Memoized package child
    PackageChild(Arc<str>),
}

/// Value stored in a hidden slot
#[derive(Debug, Clone)]
pub enum PrivateValue {
    /// Script value
    Value(Value),
    /// MetadataNode tag
    Node(Arc<MetadataNode>),
    /// Type or class name
    TypeName(Arc<str>),
}

/// Script-supplied function body
pub type ScriptFn = Rc<dyn Fn(&mut Engine, Value, &[Value]) -> BridgeResult<Value>>;

/// Native callback, tagged with the data it needs
#[derive(Clone)]
pub enum NativeCallback {
    /// Overloaded foreign method
    Method(Rc<MethodGroup>),
    /// Constructor of a foreign class
    ClassConstructor(Arc<MetadataNode>),
    /// Constructor of a foreign interface implementation
    InterfaceConstructor(Arc<MetadataNode>),
    /// Constructor of a class synthesized by `extend`
    ExtendedConstructor(Rc<ExtendedClassData>),
    /// The static `extend` function
    Extend(Arc<MetadataNode>),
    /// `valueOf` of a null placeholder
    NullValueOf,
    /// `Symbol.hasInstance` of an interface
    HasInstance(ClassRef),
    /// Diagnostic-naming shim forwarding to `target`
    Shim {
        /// Wrapped function
        target: ObjectId,
        /// Forward as a construct call
        is_constructor: bool,
        /// Source origin reported for the shim
        origin: Arc<str>,
    },
}

impl fmt::Debug for NativeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeCallback::Method(group) => write!(f, "Method({})", group.name()),
            NativeCallback::ClassConstructor(node) => write!(f, "ClassConstructor({})", node.name()),
            NativeCallback::InterfaceConstructor(node) => write!(f, "InterfaceConstructor({})", node.name()),
            NativeCallback::ExtendedConstructor(data) => write!(f, "ExtendedConstructor({})", data.full_class_name),
            NativeCallback::Extend(node) => write!(f, "Extend({})", node.name()),
            NativeCallback::NullValueOf => f.write_str("NullValueOf"),
            NativeCallback::HasInstance(class) => write!(f, "HasInstance({class:?})"),
            NativeCallback::Shim { target, .. } => write!(f, "Shim({target:?})"),
        }
    }
}

/// Function body
#[derive(Clone)]
pub enum Callable {
    /// Native callback
    Native(NativeCallback),
    /// Script closure
    Script(ScriptFn),
}

/// Function payload of a callable object
#[derive(Clone)]
pub struct FunctionData {
    /// Function name
    pub name: Arc<str>,
    /// Body
    pub callable: Callable,
}

/// Indexed property handler of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedHandler {
    /// Element access delegates to the foreign array
    ForeignArray,
}

/// Blueprint for objects sharing an indexed handler and accessors
#[derive(Debug, Clone, Default)]
pub struct ObjectTemplate {
    /// Handler for integer-indexed access
    pub indexed: Option<IndexedHandler>,
    /// Accessors installed on every instance
    pub accessors: Vec<(PropertyKey, Accessor)>,
}

/// One object on the heap
#[derive(Default)]
pub struct ObjectData {
    pub(crate) properties: FxHashMap<PropertyKey, Property>,
    pub(crate) prototype: Option<ObjectId>,
    pub(crate) private: FxHashMap<PrivateKey, PrivateValue>,
    pub(crate) call_super: bool,
    pub(crate) function: Option<FunctionData>,
    pub(crate) template: Option<Rc<ObjectTemplate>>,
}
