//! Change events and their log messages.

use std::fmt;
use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};

/// Kind of change observed under the watched root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

impl ActivityKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Modified => "Modified",
            Self::Deleted => "Deleted",
            Self::Moved => "Moved",
        }
    }
}

/// One change under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub path: PathBuf,
    /// Target of a move.
    pub destination: Option<PathBuf>,
    pub is_directory: bool,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self {
            kind,
            path: path.into(),
            destination: None,
            is_directory,
        }
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self {
            kind: ActivityKind::Moved,
            path: from.into(),
            destination: Some(to.into()),
            is_directory,
        }
    }

    /// Translate a notify event into zero or more activity events.
    ///
    /// Access notifications and unclassified events are dropped. A rename
    /// reported as a pair becomes one `Moved`; a lone rename half becomes
    /// `Deleted` (source side) or `Created` (destination side).
    pub fn from_notify(event: &Event) -> Vec<ActivityEvent> {
        match event.kind {
            EventKind::Create(kind) => event
                .paths
                .iter()
                .map(|p| {
                    let is_directory = kind == CreateKind::Folder || p.is_dir();
                    Self::new(ActivityKind::Created, p, is_directory)
                })
                .collect(),

            EventKind::Modify(ModifyKind::Name(mode)) => Self::from_rename(mode, &event.paths),

            EventKind::Modify(_) => event
                .paths
                .iter()
                .map(|p| Self::new(ActivityKind::Modified, p, p.is_dir()))
                .collect(),

            EventKind::Remove(kind) => event
                .paths
                .iter()
                .map(|p| Self::new(ActivityKind::Deleted, p, kind == RemoveKind::Folder))
                .collect(),

            EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
        }
    }

    fn from_rename(mode: RenameMode, paths: &[PathBuf]) -> Vec<ActivityEvent> {
        match (mode, paths) {
            (RenameMode::Both, [from, to, ..]) => vec![Self::moved(from, to, to.is_dir())],
            (RenameMode::From, _) => paths
                .iter()
                .map(|p| Self::new(ActivityKind::Deleted, p, false))
                .collect(),
            (RenameMode::To, _) => paths
                .iter()
                .map(|p| Self::new(ActivityKind::Created, p, p.is_dir()))
                .collect(),
            // Backends that cannot pair renames report each side on its own;
            // whether the path still exists tells the sides apart.
            _ => paths
                .iter()
                .map(|p| match p.symlink_metadata() {
                    Ok(meta) => Self::new(ActivityKind::Created, p, meta.is_dir()),
                    Err(_) => Self::new(ActivityKind::Deleted, p, false),
                })
                .collect(),
        }
    }

    /// Log message, e.g. `Created file: /share/a.txt` or
    /// `Moved directory: from /share/a to /share/b`.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    fn noun(&self) -> &'static str {
        if self.is_directory { "directory" } else { "file" }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.destination) {
            (ActivityKind::Moved, Some(to)) => write!(
                f,
                "Moved {}: from {} to {}",
                self.noun(),
                self.path.display(),
                to.display()
            ),
            (kind, _) => write!(f, "{} {}: {}", kind.label(), self.noun(), self.path.display()),
        }
    }
}
