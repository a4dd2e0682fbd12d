//! Foreign Type Metadata
//!
//! This crate decodes the precompiled description of a foreign runtime's
//! namespaces, classes, interfaces and members. Metadata arrives as three
//! flat buffers (node records, name table, value table); types registered
//! at run time may instead carry inline textual metadata.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cursor;
pub mod entry;
pub mod error;
pub mod inline;
pub mod loader;
pub mod reader;
pub mod tree;
pub mod writer;

pub use cursor::{MetadataCursor, NameTable};
pub use entry::{MetadataEntry, NodeKind, PropertyEntry, TypeMembers};
pub use error::{DecodeError, MetadataError, MetadataResult};
pub use inline::{parse_inline, InlineType};
pub use loader::{LoadError, MetadataBuffers};
pub use reader::{InterfaceImplementation, MetadataReader, TypeMetadataProvider};
pub use tree::{TreeNode, TreeNodeId, NODE_RECORD_SIZE};
pub use writer::{MetadataWriter, TypeDef};
