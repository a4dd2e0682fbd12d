//! Decoded metadata tree nodes

use std::sync::Arc;

use crate::entry::NodeKind;

/// Size in bytes of one record in the node buffer
pub const NODE_RECORD_SIZE: usize = 16;

/// Index of a node in the metadata tree arena
///
/// Ids are stable for the life of the reader; nodes are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeNodeId(pub(crate) u32);

impl TreeNodeId {
    /// The root package; it is its own parent
    pub const ROOT: TreeNodeId = TreeNodeId(0);

    /// Arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw id value
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// One node of the metadata tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Simple name of this segment
    pub name: Arc<str>,
    /// Upward link; the root points at itself
    pub parent: TreeNodeId,
    /// Child nodes in declaration order
    pub children: Vec<TreeNodeId>,
    /// Node kind
    pub kind: NodeKind,
    /// Offset of the type record in the value table (0 for packages)
    pub value_offset: u32,
    /// Inline textual metadata for lazily registered types
    pub inline_metadata: Option<Arc<str>>,
}

impl TreeNode {
    pub(crate) fn new(name: &str, parent: TreeNodeId, kind: NodeKind) -> Self {
        Self {
            name: Arc::from(name),
            parent,
            children: Vec::new(),
            kind,
            value_offset: 0,
            inline_metadata: None,
        }
    }
}

/// Marker segment under the root that parents every array type
pub const ARRAY_MARKER_NAME: &str = "[";

/// Split a slash-separated type name into tree path segments
///
/// `a/b/C$D` yields `["a", "b", "C", "D"]`: packages are separated by `/`,
/// nested types by `$` in the last segment.
pub fn path_segments(name: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = name.split('/').collect();
    let last = segments.pop().unwrap_or_default();
    segments.extend(last.split('$'));
    segments.retain(|s| !s.is_empty());
    segments
}
