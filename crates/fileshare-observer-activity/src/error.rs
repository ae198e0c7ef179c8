use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the activity logger.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// Change notifications could not be registered for the root.
    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The activity log could not be opened or written.
    #[error("Activity log I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ActivityError>;
