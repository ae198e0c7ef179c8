//! Lazy directory tree traversal.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use jwalk::{Parallelism, WalkDir};

use fileshare_observer_core::{
    EntryKind, ScanConfig, ScanError, ScanWarning, TreeEntry, WarningKind,
};

/// One step of a walk: an entry, or a skipped entry with the reason.
pub type WalkItem = Result<TreeEntry, ScanWarning>;

/// Lazy sequence of walk items.
pub type Walk<'a> = Box<dyn Iterator<Item = WalkItem> + 'a>;

/// Traversal of a directory tree rooted at a path.
///
/// Implementations must produce entries lazily and must keep going after a
/// per-entry failure, reporting it as an `Err` item. Only a root that cannot
/// be reached at all fails the call itself. Every call performs a fresh
/// traversal; no state is cached between walks. Sibling order is unspecified.
pub trait TreeWalker: Send + Sync {
    /// Start walking `root`. The root itself is not yielded.
    fn walk<'a>(&'a self, root: &Path) -> Result<Walk<'a>, ScanError>;
}

/// Depth-first walker backed by jwalk.
#[derive(Debug, Clone)]
pub struct JwalkWalker {
    follow_symlinks: bool,
    include_hidden: bool,
    threads: usize,
}

impl JwalkWalker {
    /// Create a serial walker that includes hidden entries and does not
    /// follow symbolic links.
    pub fn new() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            threads: 1,
        }
    }

    /// Create a walker with the traversal options of a scan config.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            include_hidden: config.include_hidden,
            threads: config.threads,
        }
    }

    fn parallelism(&self) -> Parallelism {
        match self.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        }
    }
}

impl Default for JwalkWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeWalker for JwalkWalker {
    fn walk<'a>(&'a self, root: &Path) -> Result<Walk<'a>, ScanError> {
        let metadata = std::fs::metadata(root).map_err(|e| ScanError::root(root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        // An offline share can still answer stat from cache; opening the
        // directory proves it can actually be listed.
        std::fs::read_dir(root).map_err(|e| ScanError::root(root, e))?;

        let walker = WalkDir::new(root)
            .parallelism(self.parallelism())
            .skip_hidden(!self.include_hidden)
            .follow_links(self.follow_symlinks)
            .min_depth(1);

        Ok(Box::new(walker.into_iter().flat_map(|result| {
            let (item, unlisted) = match result {
                // jwalk attaches a failed listing to the directory entry
                // instead of yielding it, so report it after the directory.
                Ok(mut entry) => {
                    let unlisted = entry
                        .read_children_error
                        .take()
                        .map(|err| Err(jwalk_warning(&err)));
                    (entry_item(&entry), unlisted)
                }
                Err(err) => (Some(Err(jwalk_warning(&err))), None),
            };
            item.into_iter().chain(unlisted)
        })))
    }
}

fn entry_item(entry: &jwalk::DirEntry<((), ())>) -> Option<WalkItem> {
    let path = entry.path();
    if entry.file_type().is_symlink() {
        return resolve_symlink(path);
    }
    match entry.metadata() {
        Ok(metadata) => classify(path, &metadata),
        Err(err) => Some(Err(ScanWarning::new(
            path,
            err.to_string(),
            WarningKind::MetadataError,
        ))),
    }
}

fn jwalk_warning(err: &jwalk::Error) -> ScanWarning {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    match err.io_error() {
        Some(io) => ScanWarning::from_io(path, io, WarningKind::ReadError),
        None => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
    }
}

/// Classify a symbolic link by its target without descending into it.
fn resolve_symlink(path: PathBuf) -> Option<WalkItem> {
    match std::fs::metadata(&path) {
        Ok(metadata) => classify(path, &metadata),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let target = std::fs::read_link(&path)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            Some(Err(ScanWarning::broken_symlink(path, &target)))
        }
        Err(err) => Some(Err(ScanWarning::from_io(
            path,
            &err,
            WarningKind::MetadataError,
        ))),
    }
}

/// Build an item from metadata. Sockets, devices and the like are skipped.
fn classify(path: PathBuf, metadata: &Metadata) -> Option<WalkItem> {
    let kind = if metadata.is_dir() {
        EntryKind::Directory
    } else if metadata.is_file() {
        EntryKind::File
    } else {
        return None;
    };
    Some(stamp(path, kind, metadata.modified(), metadata.len()))
}

/// An entry whose mtime cannot be read is skipped, not dated to the epoch.
fn stamp(path: PathBuf, kind: EntryKind, modified: io::Result<SystemTime>, len: u64) -> WalkItem {
    let modified = match modified {
        Ok(modified) => modified,
        Err(err) => return Err(ScanWarning::from_io(path, &err, WarningKind::MetadataError)),
    };
    Ok(match kind {
        EntryKind::Directory => TreeEntry::directory(path, modified),
        EntryKind::File => TreeEntry::file(path, modified, len),
    })
}
