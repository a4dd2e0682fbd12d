//! Metadata writer
//!
//! Builds a metadata tree in memory and emits the three flat buffers the
//! [`MetadataReader`](crate::MetadataReader) consumes. Used by the metadata
//! generator tooling and by tests.

use rustc_hash::FxHashMap;

use crate::entry::{MetadataEntry, NodeKind, PropertyEntry, TypeMembers};
use crate::error::{MetadataError, MetadataResult};
use crate::loader::MetadataBuffers;
use crate::tree::{path_segments, ARRAY_MARKER_NAME};

/// Declaration of a class or interface
#[derive(Debug, Clone)]
pub struct TypeDef {
    kind: NodeKind,
    base: Option<String>,
    implementation: Option<(String, bool)>,
    members: TypeMembers,
}

impl TypeDef {
    /// Start a class declaration
    pub fn class() -> Self {
        Self::new(NodeKind::Class)
    }

    /// Start an interface declaration
    pub fn interface() -> Self {
        Self::new(NodeKind::Interface)
    }

    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            base: None,
            implementation: None,
            members: TypeMembers::default(),
        }
    }

    /// Set the base type by full name
    pub fn base(mut self, name: impl Into<String>) -> Self {
        self.base = Some(name.into());
        self
    }

    /// Set the implementation type of an interface
    pub fn implementation(mut self, name: impl Into<String>, is_prefix: bool) -> Self {
        self.implementation = Some((name.into(), is_prefix));
        self
    }

    /// Add an instance method
    pub fn method(mut self, name: &str, signature: &str, param_count: usize) -> Self {
        self.members
            .instance_methods
            .push(MetadataEntry::method(name, signature, param_count));
        self
    }

    /// Add an extension function declared by `declaring_type`
    pub fn extension_function(mut self, name: &str, signature: &str, param_count: usize, declaring_type: &str) -> Self {
        self.members
            .extension_functions
            .push(MetadataEntry::method(name, signature, param_count).with_extension(declaring_type));
        self
    }

    /// Add an instance field
    pub fn field(mut self, name: &str, signature: &str, is_final: bool) -> Self {
        self.members
            .instance_fields
            .push(MetadataEntry::field(name, signature).with_final(is_final));
        self
    }

    /// Add a property backed by getter and setter methods
    pub fn property(mut self, name: &str, getter: Option<(&str, &str)>, setter: Option<(&str, &str)>) -> Self {
        self.members.properties.push(PropertyEntry {
            name: name.to_string(),
            getter: getter.map(|(n, sig)| MetadataEntry::method(n, sig, 0)),
            setter: setter.map(|(n, sig)| MetadataEntry::method(n, sig, 1)),
        });
        self
    }

    /// Add a static method
    pub fn static_method(mut self, name: &str, signature: &str, param_count: usize) -> Self {
        self.members
            .static_methods
            .push(MetadataEntry::method(name, signature, param_count).with_static(true));
        self
    }

    /// Add a static field
    pub fn static_field(mut self, name: &str, signature: &str, is_final: bool) -> Self {
        self.members
            .static_fields
            .push(MetadataEntry::field(name, signature).with_static(true).with_final(is_final));
        self
    }
}

struct WriterNode {
    name: String,
    children: Vec<usize>,
    kind: NodeKind,
    def: Option<TypeDef>,
}

/// In-memory metadata tree builder
pub struct MetadataWriter {
    nodes: Vec<WriterNode>,
}

impl MetadataWriter {
    /// Create a writer holding only the root package
    pub fn new() -> Self {
        Self {
            nodes: vec![WriterNode {
                name: String::new(),
                children: Vec::new(),
                kind: NodeKind::Package,
                def: None,
            }],
        }
    }

    /// Declare a package path such as `java/lang`
    pub fn package(&mut self, path: &str) -> &mut Self {
        let mut current = 0;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = self.child(current, segment, NodeKind::Package);
        }
        self
    }

    /// Declare a type by full name, creating enclosing packages and types
    pub fn add_type(&mut self, name: &str, def: TypeDef) -> &mut Self {
        let (packages, types) = split_packages(name);
        let mut current = 0;
        for segment in packages {
            current = self.child(current, segment, NodeKind::Package);
        }
        for segment in types {
            current = self.child(current, segment, NodeKind::Class);
        }
        self.nodes[current].kind = def.kind;
        self.nodes[current].def = Some(def);
        self
    }

    /// Declare the array marker node under the root
    pub fn array_marker(&mut self) -> &mut Self {
        self.child(0, ARRAY_MARKER_NAME, NodeKind::ArrayMarker);
        self
    }

    fn child(&mut self, parent: usize, name: &str, kind: NodeKind) -> usize {
        if let Some(&existing) = self.nodes[parent]
            .children
            .iter()
            .find(|&&c| self.nodes[c].name == name)
        {
            return existing;
        }
        let id = self.nodes.len();
        self.nodes.push(WriterNode {
            name: name.to_string(),
            children: Vec::new(),
            kind,
            def: None,
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        let mut current = 0;
        for segment in path_segments(name) {
            current = *self.nodes[current]
                .children
                .iter()
                .find(|&&c| self.nodes[c].name == segment)?;
        }
        (current != 0).then_some(current)
    }

    /// Emit the node, name and value buffers
    pub fn finish(&self) -> MetadataResult<MetadataBuffers> {
        let mut names = NameInterner::default();
        names.intern("")?;
        // Offset 0 of the value table is reserved so that 0 can mean "package"
        let mut values = vec![0u8];
        let mut nodes = Vec::with_capacity(self.nodes.len() * 16);

        let mut next_sibling = vec![0u32; self.nodes.len()];
        for node in &self.nodes {
            for pair in node.children.windows(2) {
                next_sibling[pair[0]] = pair[1] as u32;
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let value_offset = match (&node.def, node.kind) {
                (Some(def), _) => {
                    let offset = values.len() as u32;
                    self.write_type(def, &mut names, &mut values)?;
                    offset
                }
                (None, NodeKind::Package) => 0,
                (None, NodeKind::ArrayMarker) => {
                    let offset = values.len() as u32;
                    values.push(NodeKind::ArrayMarker.as_u8());
                    offset
                }
                (None, kind) => {
                    let offset = values.len() as u32;
                    self.write_type(&TypeDef::new(kind), &mut names, &mut values)?;
                    offset
                }
            };
            let first_child = node.children.first().map(|&c| c as u32).unwrap_or(0);
            nodes.extend_from_slice(&names.intern(&node.name)?.to_le_bytes());
            nodes.extend_from_slice(&value_offset.to_le_bytes());
            nodes.extend_from_slice(&first_child.to_le_bytes());
            nodes.extend_from_slice(&next_sibling[index].to_le_bytes());
        }

        Ok(MetadataBuffers {
            nodes,
            names: names.buffer,
            values,
        })
    }

    fn write_type(&self, def: &TypeDef, names: &mut NameInterner, values: &mut Vec<u8>) -> MetadataResult<()> {
        values.push(def.kind.as_u8());
        let base = match &def.base {
            Some(base) => self
                .lookup(base)
                .ok_or_else(|| MetadataError::UnknownType(base.clone()))? as u32,
            None => 0,
        };
        values.extend_from_slice(&base.to_le_bytes());
        if def.kind == NodeKind::Interface {
            let (name, is_prefix) = def.implementation.clone().unwrap_or_default();
            values.push(u8::from(is_prefix));
            values.extend_from_slice(&names.intern(&name)?.to_le_bytes());
        }

        let members = &def.members;
        write_section(values, &members.extension_functions, |v, e| {
            write_method(v, names, e)?;
            v.extend_from_slice(&names.intern(e.declaring_type.as_deref().unwrap_or(""))?.to_le_bytes());
            Ok(())
        })?;
        write_section(values, &members.instance_methods, |v, e| write_method(v, names, e))?;
        write_section(values, &members.instance_fields, |v, e| write_field(v, names, e))?;
        write_section(values, &members.properties, |v, p| {
            v.extend_from_slice(&names.intern(&p.name)?.to_le_bytes());
            for accessor in [&p.getter, &p.setter] {
                match accessor {
                    Some(entry) => {
                        v.extend_from_slice(&1u16.to_le_bytes());
                        write_method(v, names, entry)?;
                    }
                    None => v.extend_from_slice(&0u16.to_le_bytes()),
                }
            }
            Ok(())
        })?;
        write_section(values, &members.static_methods, |v, e| write_method(v, names, e))?;
        write_section(values, &members.static_fields, |v, e| write_field(v, names, e))?;
        Ok(())
    }
}

impl Default for MetadataWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn split_packages(name: &str) -> (Vec<&str>, Vec<&str>) {
    let mut packages: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();
    let last = packages.pop().unwrap_or_default();
    let types = last.split('$').filter(|s| !s.is_empty()).collect();
    (packages, types)
}

fn to_u16(what: &'static str, len: usize) -> MetadataResult<u16> {
    u16::try_from(len).map_err(|_| MetadataError::TooLarge { what, len })
}

fn write_section<T>(
    values: &mut Vec<u8>,
    items: &[T],
    mut write: impl FnMut(&mut Vec<u8>, &T) -> MetadataResult<()>,
) -> MetadataResult<()> {
    values.extend_from_slice(&to_u16("member count", items.len())?.to_le_bytes());
    for item in items {
        write(values, item)?;
    }
    Ok(())
}

fn write_method(values: &mut Vec<u8>, names: &mut NameInterner, entry: &MetadataEntry) -> MetadataResult<()> {
    values.extend_from_slice(&names.intern(&entry.name)?.to_le_bytes());
    values.extend_from_slice(&names.intern(&entry.signature)?.to_le_bytes());
    values.extend_from_slice(&to_u16("parameter count", entry.param_count)?.to_le_bytes());
    values.push(entry.flag_bits());
    Ok(())
}

fn write_field(values: &mut Vec<u8>, names: &mut NameInterner, entry: &MetadataEntry) -> MetadataResult<()> {
    values.extend_from_slice(&names.intern(&entry.name)?.to_le_bytes());
    values.extend_from_slice(&names.intern(&entry.signature)?.to_le_bytes());
    values.push(entry.flag_bits());
    Ok(())
}

#[derive(Default)]
struct NameInterner {
    buffer: Vec<u8>,
    offsets: FxHashMap<String, u32>,
}

impl NameInterner {
    fn intern(&mut self, name: &str) -> MetadataResult<u32> {
        if let Some(&offset) = self.offsets.get(name) {
            return Ok(offset);
        }
        let len = to_u16("name length", name.len())?;
        let offset = self.buffer.len() as u32;
        self.buffer.extend_from_slice(&len.to_le_bytes());
        self.buffer.extend_from_slice(name.as_bytes());
        self.offsets.insert(name.to_string(), offset);
        Ok(offset)
    }
}
