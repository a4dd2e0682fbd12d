//! Error types for metadata decoding and lookup

use thiserror::Error;

/// Errors that can occur while reading the flat metadata buffers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Unexpected end of a buffer
    #[error("Unexpected end of metadata at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid UTF-8 in the name table
    #[error("Invalid UTF-8 name at offset {0}")]
    InvalidUtf8(usize),

    /// Unknown node kind byte in the value table
    #[error("Invalid node kind {0} at offset {1}")]
    InvalidNodeKind(u8, usize),
}

/// Errors raised by the metadata tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// A buffer could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The node buffer is empty or not a whole number of records
    #[error("Node buffer of {len} bytes is not a multiple of the {record_size} byte record size")]
    MalformedNodes {
        /// Length of the node buffer
        len: usize,
        /// Size of one node record
        record_size: usize,
    },

    /// A child or sibling link points outside the node buffer or revisits a node
    #[error("Node record {0} has an invalid link")]
    InvalidLink(u32),

    /// The requested name has no node in the tree and could not be created lazily
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Inline textual metadata could not be parsed
    #[error("Inline metadata line {line}: {message}")]
    InlineSyntax {
        /// One-based line number
        line: usize,
        /// What was wrong with the line
        message: String,
    },

    /// A count or name length does not fit its 16-bit field
    #[error("{what} of {len} exceeds the 16-bit limit")]
    TooLarge {
        /// Which field overflowed
        what: &'static str,
        /// The value that did not fit
        len: usize,
    },

    /// The operation requires a class or interface node
    #[error("Node '{0}' is not a type")]
    NotAType(String),
}

/// Result alias for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;
