//! Traversal entry types.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Type of a visited file system object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file (or a link resolving to one).
    File,
    /// Directory (or a link resolving to one).
    Directory,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Lowercase label used in log and activity messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// A single object produced by a tree walk.
///
/// Entries are ephemeral: the scanner folds each one into its aggregates
/// and drops it, except for the few retained by the top-K selections.
/// `modified` is the traversal-time snapshot; nothing is re-stat'ed later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Entry type.
    pub kind: EntryKind,
    /// Full path, including any UNC prefix of the root.
    pub path: PathBuf,
    /// Last modification time.
    pub modified: SystemTime,
    /// Size in bytes (always 0 for directories).
    pub size: u64,
}

impl TreeEntry {
    /// Create a file entry.
    pub fn file(path: impl Into<PathBuf>, modified: SystemTime, size: u64) -> Self {
        Self {
            kind: EntryKind::File,
            path: path.into(),
            modified,
            size,
        }
    }

    /// Create a directory entry. Directories never carry a size.
    pub fn directory(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            kind: EntryKind::Directory,
            path: path.into(),
            modified,
            size: 0,
        }
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Borrow the entry path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
