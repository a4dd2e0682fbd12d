//! Member descriptors produced by both metadata formats

/// Flag bits stored with method and field entries
pub mod flags {
    /// Member is final (fields: read-only)
    pub const FINAL: u8 = 0x01;
}

/// Kind of a metadata tree node, fixed at decode time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Namespace with child packages and types
    Package,
    /// Concrete or abstract class
    Class,
    /// Interface
    Interface,
    /// Parent of every array type node
    ArrayMarker,
}

impl NodeKind {
    /// Decode a kind byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(NodeKind::Package),
            1 => Some(NodeKind::Class),
            2 => Some(NodeKind::Interface),
            3 => Some(NodeKind::ArrayMarker),
            _ => None,
        }
    }

    /// Encode as a kind byte
    pub fn as_u8(self) -> u8 {
        match self {
            NodeKind::Package => 0,
            NodeKind::Class => 1,
            NodeKind::Interface => 2,
            NodeKind::ArrayMarker => 3,
        }
    }

    /// Class or interface
    pub fn is_type(self) -> bool {
        matches!(self, NodeKind::Class | NodeKind::Interface)
    }
}

/// One declared method or field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    /// Declared member name
    pub name: String,
    /// Foreign signature, e.g. `(ILjava/lang/String;)V`
    pub signature: String,
    /// Part of the signature after the parameter list
    pub return_type: String,
    /// Number of declared parameters
    pub param_count: usize,
    /// Static member
    pub is_static: bool,
    /// Final member
    pub is_final: bool,
    /// Extension function declared outside the owning type
    pub is_extension_function: bool,
    /// Type that declares the member when it differs from the owner
    pub declaring_type: Option<String>,
}

impl MetadataEntry {
    /// Create an instance method entry
    pub fn method(name: impl Into<String>, signature: impl Into<String>, param_count: usize) -> Self {
        let signature = signature.into();
        Self {
            name: name.into(),
            return_type: return_type_of(&signature),
            signature,
            param_count,
            is_static: false,
            is_final: false,
            is_extension_function: false,
            declaring_type: None,
        }
    }

    /// Create an instance field entry
    pub fn field(name: impl Into<String>, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        Self {
            name: name.into(),
            return_type: signature.clone(),
            signature,
            param_count: 0,
            is_static: false,
            is_final: false,
            is_extension_function: false,
            declaring_type: None,
        }
    }

    /// Mark the entry static
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Mark the entry final
    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    /// Turn the entry into an extension function declared by `declaring_type`
    pub fn with_extension(mut self, declaring_type: impl Into<String>) -> Self {
        self.is_extension_function = true;
        self.declaring_type = Some(declaring_type.into());
        self
    }

    /// Set the declaring type without changing the extension flag
    pub fn with_declaring_type(mut self, declaring_type: impl Into<String>) -> Self {
        self.declaring_type = Some(declaring_type.into());
        self
    }

    /// Flag byte as stored in the value table
    pub fn flag_bits(&self) -> u8 {
        if self.is_final {
            flags::FINAL
        } else {
            0
        }
    }
}

fn return_type_of(signature: &str) -> String {
    match signature.rfind(')') {
        Some(pos) => signature[pos + 1..].to_string(),
        None => String::new(),
    }
}

/// Property sugar over a getter/setter method pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    /// Property name as seen by scripts
    pub name: String,
    /// Getter method, if any
    pub getter: Option<MetadataEntry>,
    /// Setter method, if any
    pub setter: Option<MetadataEntry>,
}

/// Every member a type declares, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMembers {
    /// Extension functions
    pub extension_functions: Vec<MetadataEntry>,
    /// Instance methods
    pub instance_methods: Vec<MetadataEntry>,
    /// Instance fields
    pub instance_fields: Vec<MetadataEntry>,
    /// Getter/setter properties
    pub properties: Vec<PropertyEntry>,
    /// Static methods
    pub static_methods: Vec<MetadataEntry>,
    /// Static fields
    pub static_fields: Vec<MetadataEntry>,
}

impl TypeMembers {
    /// True when no member of any kind is declared
    pub fn is_empty(&self) -> bool {
        self.extension_functions.is_empty()
            && self.instance_methods.is_empty()
            && self.instance_fields.is_empty()
            && self.properties.is_empty()
            && self.static_methods.is_empty()
            && self.static_fields.is_empty()
    }
}
