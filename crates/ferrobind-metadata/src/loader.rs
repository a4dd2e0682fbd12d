//! Loading the metadata buffers from storage

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::error::MetadataError;
use crate::tree::NODE_RECORD_SIZE;

/// File holding the node records
pub const NODES_FILE: &str = "nodes.dat";
/// File holding the name table
pub const NAMES_FILE: &str = "names.dat";
/// File holding the value table
pub const VALUES_FILE: &str = "values.dat";

/// Errors raised while loading metadata from a directory
#[derive(Debug, Error)]
pub enum LoadError {
    /// The metadata directory cannot be reached (e.g. credential-encrypted storage before unlock)
    #[error("metadata folder couldn't be opened! ({path}): {source}")]
    StorageLocked {
        /// Directory that was probed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// One of the three metadata files is missing
    #[error("metadata file ({path}) couldn't be opened!")]
    MissingFile {
        /// Path of the missing file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure
    #[error("Failed to read metadata: {0}")]
    Io(#[from] io::Error),

    /// Loaded buffers are not well formed
    #[error(transparent)]
    Malformed(#[from] MetadataError),
}

/// The three flat metadata buffers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBuffers {
    /// Fixed-size node records
    pub nodes: Vec<u8>,
    /// Length-prefixed names
    pub names: Vec<u8>,
    /// Type records
    pub values: Vec<u8>,
}

impl MetadataBuffers {
    /// Load `nodes.dat`, `names.dat` and `values.dat` from `dir`
    pub fn load_from_dir(dir: &Path) -> Result<Self, LoadError> {
        let started = Instant::now();

        if let Err(source) = fs::read_dir(dir) {
            return Err(match source.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => LoadError::StorageLocked {
                    path: dir.to_path_buf(),
                    source,
                },
                _ => LoadError::Io(source),
            });
        }

        let buffers = Self {
            nodes: read_file(&dir.join(NODES_FILE))?,
            names: read_file(&dir.join(NAMES_FILE))?,
            values: read_file(&dir.join(VALUES_FILE))?,
        };
        buffers.validate()?;

        tracing::info!(
            path = %dir.display(),
            nodes = buffers.nodes.len(),
            names = buffers.names.len(),
            values = buffers.values.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded metadata"
        );
        Ok(buffers)
    }

    /// Write the three files into `dir`
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(NODES_FILE), &self.nodes)?;
        fs::write(dir.join(NAMES_FILE), &self.names)?;
        fs::write(dir.join(VALUES_FILE), &self.values)
    }

    /// Check that the node buffer holds a whole, non-zero number of records
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.nodes.is_empty() || self.nodes.len() % NODE_RECORD_SIZE != 0 {
            return Err(MetadataError::MalformedNodes {
                len: self.nodes.len(),
                record_size: NODE_RECORD_SIZE,
            });
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::MissingFile {
            path: path.to_path_buf(),
            source,
        },
        _ => LoadError::Io(source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_partial_record() {
        let buffers = MetadataBuffers {
            nodes: vec![0; NODE_RECORD_SIZE + 3],
            ..Default::default()
        };
        assert!(matches!(buffers.validate(), Err(MetadataError::MalformedNodes { len, .. }) if len == NODE_RECORD_SIZE + 3));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(MetadataBuffers::default().validate().is_err());
    }

    #[test]
    fn test_missing_directory_is_storage_locked() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("metadata");
        let err = MetadataBuffers::load_from_dir(&missing).unwrap_err();
        assert!(matches!(err, LoadError::StorageLocked { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(NODES_FILE), vec![0u8; NODE_RECORD_SIZE]).unwrap();
        let err = MetadataBuffers::load_from_dir(dir.path()).unwrap_err();
        match err {
            LoadError::MissingFile { path, .. } => assert!(path.ends_with(NAMES_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
