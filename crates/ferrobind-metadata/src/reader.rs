//! Metadata tree reader
//!
//! Decodes the node buffer into an arena of [`TreeNode`]s up front and
//! answers type queries against the value and name tables on demand. The
//! arena only grows: array types and lazily described types are appended
//! the first time they are asked for, so ids handed out earlier stay valid.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::cursor::{MetadataCursor, NameTable};
use crate::entry::{NodeKind, TypeMembers};
use crate::error::{DecodeError, MetadataError, MetadataResult};
use crate::inline::parse_inline;
use crate::loader::MetadataBuffers;
use crate::tree::{path_segments, TreeNode, TreeNodeId, ARRAY_MARKER_NAME, NODE_RECORD_SIZE};

/// Source of inline metadata for types missing from the binary tree
pub trait TypeMetadataProvider: Send + Sync {
    /// Inline metadata text for `name`, or `None` if the type is unknown
    fn type_metadata(&self, name: &str) -> Option<String>;
}

/// Implementation type declared by an interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceImplementation {
    /// Implementation type name, or the prefix to prepend to the interface name
    pub name: String,
    /// `name` is a prefix rather than a complete type name
    pub is_prefix: bool,
}

struct TypeRecord {
    base: Option<TreeNodeId>,
    implementation: Option<InterfaceImplementation>,
    members_offset: usize,
}

/// Reader over the decoded metadata tree
pub struct MetadataReader {
    names: Vec<u8>,
    values: Vec<u8>,
    nodes: RwLock<Vec<TreeNode>>,
    provider: Option<Box<dyn TypeMetadataProvider>>,
}

impl MetadataReader {
    /// Decode the three metadata buffers
    pub fn from_buffers(buffers: MetadataBuffers) -> MetadataResult<Self> {
        buffers.validate()?;
        let MetadataBuffers { nodes, names, values } = buffers;
        let arena = decode_nodes(&nodes, &names, &values)?;
        tracing::debug!(nodes = arena.len(), "Decoded metadata tree");
        Ok(Self {
            names,
            values,
            nodes: RwLock::new(arena),
            provider: None,
        })
    }

    /// Attach a lazy source for types the binary tree does not contain
    pub fn with_provider(mut self, provider: Box<dyn TypeMetadataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    // ===== Node queries =====

    /// The root package
    pub fn root(&self) -> TreeNodeId {
        TreeNodeId::ROOT
    }

    /// Number of nodes currently in the tree
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Simple name of a node
    pub fn name(&self, id: TreeNodeId) -> Arc<str> {
        self.nodes.read()[id.index()].name.clone()
    }

    /// Kind of a node
    pub fn kind(&self, id: TreeNodeId) -> NodeKind {
        self.nodes.read()[id.index()].kind
    }

    /// Parent of a node; the root is its own parent
    pub fn parent(&self, id: TreeNodeId) -> TreeNodeId {
        self.nodes.read()[id.index()].parent
    }

    /// Children of a node in declaration order
    pub fn children(&self, id: TreeNodeId) -> Vec<TreeNodeId> {
        self.nodes.read()[id.index()].children.clone()
    }

    /// Inline metadata attached to a lazily registered node
    pub fn inline_metadata(&self, id: TreeNodeId) -> Option<Arc<str>> {
        self.nodes.read()[id.index()].inline_metadata.clone()
    }

    /// Child of `id` with the given simple name
    pub fn find_child(&self, id: TreeNodeId, name: &str) -> Option<TreeNodeId> {
        let nodes = self.nodes.read();
        find_child_in(&nodes, id, name)
    }

    /// True if the node's parent is the array marker
    pub fn is_array_type(&self, id: TreeNodeId) -> bool {
        let nodes = self.nodes.read();
        let parent = nodes[id.index()].parent;
        nodes[parent.index()].kind == NodeKind::ArrayMarker
    }

    /// Full slash-separated type name of a node
    ///
    /// Packages are joined with `/`, nested types with `$`, and array types
    /// are their element descriptor prefixed with `[`.
    pub fn read_type_name(&self, id: TreeNodeId) -> String {
        let nodes = self.nodes.read();
        let node = &nodes[id.index()];
        if id == TreeNodeId::ROOT {
            return String::new();
        }
        if nodes[node.parent.index()].kind == NodeKind::ArrayMarker {
            return format!("[{}", node.name);
        }

        let mut segments = vec![(node.name.clone(), node.parent)];
        let mut current = node.parent;
        while current != TreeNodeId::ROOT {
            let n = &nodes[current.index()];
            segments.push((n.name.clone(), n.parent));
            current = n.parent;
        }

        let mut name = String::new();
        for (i, (segment, parent)) in segments.iter().rev().enumerate() {
            if i > 0 {
                let separator = if nodes[parent.index()].kind.is_type() { '$' } else { '/' };
                name.push(separator);
            }
            name.push_str(segment);
        }
        name
    }

    // ===== Type records =====

    /// Declared base type of a class or interface
    pub fn base_class_node(&self, id: TreeNodeId) -> MetadataResult<Option<TreeNodeId>> {
        if let Some(text) = self.inline_metadata(id) {
            let parsed = parse_inline(&text)?;
            return match parsed.base {
                Some(base) => Ok(Some(self.get_or_create_tree_node_by_name(&base)?)),
                None => Ok(None),
            };
        }
        Ok(self.type_record(id)?.and_then(|record| record.base))
    }

    /// Implementation type declared by an interface node
    pub fn interface_implementation(&self, id: TreeNodeId) -> MetadataResult<Option<InterfaceImplementation>> {
        Ok(self.type_record(id)?.and_then(|record| record.implementation))
    }

    /// All members a type declares, from inline or binary metadata
    pub fn members(&self, id: TreeNodeId) -> MetadataResult<TypeMembers> {
        if let Some(text) = self.inline_metadata(id) {
            return Ok(parse_inline(&text)?.members);
        }
        let record = match self.type_record(id)? {
            Some(record) => record,
            None => return Ok(TypeMembers::default()),
        };

        let names = NameTable::new(&self.names);
        let mut cursor = MetadataCursor::at(&self.values, record.members_offset);
        let extension_functions = cursor.read_section(|c| c.read_extension_entry(&names))?;
        let instance_methods = cursor.read_section(|c| c.read_method_entry(&names, false))?;
        let instance_fields = cursor.read_section(|c| c.read_field_entry(&names, false))?;
        let properties = cursor.read_section(|c| c.read_property_entry(&names))?;
        let static_methods = cursor.read_section(|c| c.read_method_entry(&names, true))?;
        let static_fields = cursor.read_section(|c| c.read_field_entry(&names, true))?;

        Ok(TypeMembers {
            extension_functions,
            instance_methods,
            instance_fields,
            properties,
            static_methods,
            static_fields,
        })
    }

    fn type_record(&self, id: TreeNodeId) -> MetadataResult<Option<TypeRecord>> {
        let (kind, offset) = {
            let nodes = self.nodes.read();
            let node = &nodes[id.index()];
            (node.kind, node.value_offset as usize)
        };
        if !kind.is_type() || offset == 0 {
            return Ok(None);
        }

        let names = NameTable::new(&self.names);
        let mut cursor = MetadataCursor::at(&self.values, offset);
        cursor.read_u8()?;
        let base = match cursor.read_u32()? {
            0 => None,
            raw if (raw as usize) < self.node_count() => Some(TreeNodeId(raw)),
            raw => return Err(MetadataError::InvalidLink(raw)),
        };
        let implementation = if kind == NodeKind::Interface {
            let is_prefix = cursor.read_u8()? != 0;
            let name = names.name_at(cursor.read_u32()?)?;
            Some(InterfaceImplementation { name, is_prefix })
        } else {
            None
        };
        Ok(Some(TypeRecord {
            base,
            implementation,
            members_offset: cursor.position(),
        }))
    }

    // ===== Name lookup =====

    /// Find an existing node by full type name
    pub fn tree_node_by_name(&self, name: &str) -> Option<TreeNodeId> {
        let nodes = self.nodes.read();
        if let Some(element) = name.strip_prefix('[') {
            let marker = find_child_in(&nodes, TreeNodeId::ROOT, ARRAY_MARKER_NAME)?;
            return find_child_in(&nodes, marker, element);
        }
        let mut current = TreeNodeId::ROOT;
        for segment in path_segments(name) {
            current = find_child_in(&nodes, current, segment)?;
        }
        (current != TreeNodeId::ROOT).then_some(current)
    }

    /// Find a node by full type name, creating array and lazily described types
    ///
    /// Array names (`[I`, `[Ljava/lang/String;`) always resolve. Other names
    /// missing from the binary tree are looked up through the attached
    /// [`TypeMetadataProvider`].
    pub fn get_or_create_tree_node_by_name(&self, name: &str) -> MetadataResult<TreeNodeId> {
        if let Some(id) = self.tree_node_by_name(name) {
            return Ok(id);
        }

        if let Some(element) = name.strip_prefix('[') {
            let mut nodes = self.nodes.write();
            let marker = get_or_append(&mut nodes, TreeNodeId::ROOT, ARRAY_MARKER_NAME, NodeKind::ArrayMarker);
            return Ok(get_or_append(&mut nodes, marker, element, NodeKind::Class));
        }

        let text = self
            .provider
            .as_ref()
            .and_then(|provider| provider.type_metadata(name))
            .ok_or_else(|| MetadataError::UnknownType(name.to_string()))?;
        let kind = parse_inline(&text)?.kind;
        let segments = path_segments(name);
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| MetadataError::UnknownType(name.to_string()))?;

        // Segments before the last `/` are packages, the rest are outer types
        let package_count = name.rsplit_once('/').map_or(0, |(packages, _)| {
            packages.split('/').filter(|s| !s.is_empty()).count()
        });

        let mut nodes = self.nodes.write();
        let mut current = TreeNodeId::ROOT;
        for (index, segment) in parents.iter().enumerate() {
            let parent_kind = if index < package_count { NodeKind::Package } else { NodeKind::Class };
            current = get_or_append(&mut nodes, current, segment, parent_kind);
        }
        if let Some(existing) = find_child_in(&nodes, current, last) {
            // Another thread registered it between the lookup and the write lock
            return Ok(existing);
        }
        let id = get_or_append(&mut nodes, current, last, kind);
        nodes[id.index()].inline_metadata = Some(Arc::from(text.as_str()));
        tracing::debug!(name, "Registered lazily described type");
        Ok(id)
    }
}

fn find_child_in(nodes: &[TreeNode], parent: TreeNodeId, name: &str) -> Option<TreeNodeId> {
    nodes[parent.index()]
        .children
        .iter()
        .copied()
        .find(|child| &*nodes[child.index()].name == name)
}

fn get_or_append(nodes: &mut Vec<TreeNode>, parent: TreeNodeId, name: &str, kind: NodeKind) -> TreeNodeId {
    if let Some(existing) = find_child_in(nodes, parent, name) {
        return existing;
    }
    let id = TreeNodeId(nodes.len() as u32);
    nodes.push(TreeNode::new(name, parent, kind));
    nodes[parent.index()].children.push(id);
    id
}

struct RawRecord {
    name_offset: u32,
    value_offset: u32,
    first_child: u32,
    next_sibling: u32,
}

fn decode_nodes(nodes: &[u8], names: &[u8], values: &[u8]) -> MetadataResult<Vec<TreeNode>> {
    let count = nodes.len() / NODE_RECORD_SIZE;
    let name_table = NameTable::new(names);
    let mut cursor = MetadataCursor::new(nodes);

    let mut raw = Vec::with_capacity(count);
    let mut arena = Vec::with_capacity(count);
    for _ in 0..count {
        let record = RawRecord {
            name_offset: cursor.read_u32()?,
            value_offset: cursor.read_u32()?,
            first_child: cursor.read_u32()?,
            next_sibling: cursor.read_u32()?,
        };
        let name = name_table.name_at(record.name_offset)?;
        let kind = if record.value_offset == 0 {
            NodeKind::Package
        } else {
            let offset = record.value_offset as usize;
            let byte = *values.get(offset).ok_or(DecodeError::UnexpectedEnd(offset))?;
            NodeKind::from_u8(byte).ok_or(DecodeError::InvalidNodeKind(byte, offset))?
        };
        let mut node = TreeNode::new(&name, TreeNodeId::ROOT, kind);
        node.value_offset = record.value_offset;
        arena.push(node);
        raw.push(record);
    }

    // Link children breadth-first from the root; every record may be reached once
    let mut visited = FxHashSet::default();
    visited.insert(0u32);
    let mut queue = vec![0u32];
    while let Some(parent) = queue.pop() {
        let mut child = raw[parent as usize].first_child;
        while child != 0 {
            if child as usize >= count || !visited.insert(child) {
                return Err(MetadataError::InvalidLink(parent));
            }
            arena[child as usize].parent = TreeNodeId(parent);
            arena[parent as usize].children.push(TreeNodeId(child));
            queue.push(child);
            child = raw[child as usize].next_sibling;
        }
    }

    Ok(arena)
}
