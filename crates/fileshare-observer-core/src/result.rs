//! Aggregate scan results.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::ScanWarning;

/// A file selected as one of the oldest or newest in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    /// Full path of the file.
    pub path: PathBuf,
    /// Modification time observed during the walk.
    pub modified: SystemTime,
    /// Size in bytes.
    pub size: u64,
}

impl FileStamp {
    /// Create a new file stamp.
    pub fn new(path: impl Into<PathBuf>, modified: SystemTime, size: u64) -> Self {
        Self {
            path: path.into(),
            modified,
            size,
        }
    }

    /// Modification time as seconds since the Unix epoch (negative before 1970).
    pub fn modified_unix_secs(&self) -> f64 {
        match self.modified.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(after) => after.as_secs_f64(),
            Err(before) => -before.duration().as_secs_f64(),
        }
    }
}

/// Immutable snapshot of one completed scan cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root path that was scanned.
    pub root: PathBuf,
    /// Number of directories below the root.
    pub directory_count: u64,
    /// Number of files below the root.
    pub file_count: u64,
    /// `directory_count + file_count`.
    pub total_entries: u64,
    /// Sum of file sizes in bytes.
    pub total_size_bytes: u64,
    /// Up to K matching files, oldest first.
    pub oldest_files: Vec<FileStamp>,
    /// Up to K matching files, newest first.
    pub newest_files: Vec<FileStamp>,
    /// When the walk started.
    pub started_at: SystemTime,
    /// When the walk finished.
    pub completed_at: SystemTime,
    /// Entries skipped because of I/O errors.
    pub error_count: u64,
    /// The first few warnings, kept for diagnostics.
    pub warnings: Vec<ScanWarning>,
}

impl ScanResult {
    /// Create an empty result for a root, stamped with the current time.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        let now = SystemTime::now();
        Self {
            root: root.into(),
            directory_count: 0,
            file_count: 0,
            total_entries: 0,
            total_size_bytes: 0,
            oldest_files: Vec::new(),
            newest_files: Vec::new(),
            started_at: now,
            completed_at: now,
            error_count: 0,
            warnings: Vec::new(),
        }
    }

    /// Wall-clock duration of the walk.
    pub fn duration(&self) -> Duration {
        self.completed_at
            .duration_since(self.started_at)
            .unwrap_or(Duration::ZERO)
    }

    /// The single oldest matching file, if any.
    pub fn oldest_file(&self) -> Option<&FileStamp> {
        self.oldest_files.first()
    }

    /// The single newest matching file, if any.
    pub fn newest_file(&self) -> Option<&FileStamp> {
        self.newest_files.first()
    }

    /// Check if any entry was skipped during the walk.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Check whether two results describe the same tree contents,
    /// ignoring timestamps and warning text.
    pub fn same_contents(&self, other: &ScanResult) -> bool {
        self.root == other.root
            && self.directory_count == other.directory_count
            && self.file_count == other.file_count
            && self.total_entries == other.total_entries
            && self.total_size_bytes == other.total_size_bytes
            && self.oldest_files == other.oldest_files
            && self.newest_files == other.newest_files
            && self.error_count == other.error_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result() {
        let result = ScanResult::empty("/share");
        assert_eq!(result.total_entries, 0);
        assert!(result.oldest_file().is_none());
        assert!(result.newest_file().is_none());
        assert!(!result.has_errors());
        assert_eq!(result.duration(), Duration::ZERO);
    }

    #[test]
    fn test_modified_unix_secs() {
        let stamp = FileStamp::new(
            "/share/a",
            SystemTime::UNIX_EPOCH + Duration::from_secs(90),
            1,
        );
        assert_eq!(stamp.modified_unix_secs(), 90.0);

        let before = FileStamp::new(
            "/share/b",
            SystemTime::UNIX_EPOCH - Duration::from_secs(10),
            1,
        );
        assert_eq!(before.modified_unix_secs(), -10.0);
    }

    #[test]
    fn test_same_contents_ignores_timestamps() {
        let first = ScanResult::empty("/share");
        let mut second = ScanResult::empty("/share");
        second.completed_at = second.started_at + Duration::from_secs(3);
        assert!(first.same_contents(&second));

        second.file_count = 1;
        assert!(!first.same_contents(&second));
    }
}
