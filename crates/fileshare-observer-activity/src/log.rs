//! Append-only activity log file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{ActivityError, Result};
use crate::event::ActivityEvent;

/// Default log file name, created in the working directory.
pub const DEFAULT_LOG_FILE: &str = "FileshareActivity.log";

const USER_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

/// Name of the user the process runs as, from the usual login variables.
pub fn current_user() -> String {
    USER_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|user| !user.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Format one log line (without the trailing newline).
pub fn format_record(at: &DateTime<Local>, pid: u32, message: &str, user: &str) -> String {
    format!(
        "{} | {} | {} | userid: {}",
        at.format("%Y-%m-%d %H:%M:%S"),
        pid,
        message,
        user
    )
}

/// Writes one line per activity event and flushes after each line.
pub struct ActivityLog<W: Write = BufWriter<File>> {
    writer: W,
    path: PathBuf,
    pid: u32,
    user: String,
}

impl ActivityLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ActivityError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_writer(BufWriter::new(file), path))
    }
}

impl<W: Write> ActivityLog<W> {
    /// Log into an arbitrary writer; `label` names it in errors.
    pub fn from_writer(writer: W, label: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: label.into(),
            pid: std::process::id(),
            user: current_user(),
        }
    }

    /// Override the user recorded on each line.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record for `event`, stamped with the current local time.
    pub fn append(&mut self, event: &ActivityEvent) -> Result<()> {
        self.append_at(&Local::now(), &event.describe())
    }

    /// Append a record with an explicit timestamp.
    pub fn append_at(&mut self, at: &DateTime<Local>, message: &str) -> Result<()> {
        let line = format_record(at, self.pid, message, &self.user);
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|source| ActivityError::Io {
                path: self.path.clone(),
                source,
            })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::event::ActivityKind;

    #[test]
    fn test_format_record() {
        let at = Local.with_ymd_and_hms(2023, 6, 1, 9, 5, 7).unwrap();
        assert_eq!(
            format_record(&at, 4242, "Created file: /share/a.txt", "svc-share"),
            "2023-06-01 09:05:07 | 4242 | Created file: /share/a.txt | userid: svc-share"
        );
    }

    #[test]
    fn test_append_writes_lines() {
        let mut log = ActivityLog::from_writer(Vec::new(), "memory").with_user("svc");
        log.append(&ActivityEvent::new(ActivityKind::Created, "/share/a.txt", false))
            .unwrap();
        log.append(&ActivityEvent::moved("/share/a.txt", "/share/b.txt", false))
            .unwrap();

        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| Created file: /share/a.txt | userid: svc"));
        assert!(lines[1].contains("| Moved file: from /share/a.txt to /share/b.txt |"));
        assert!(lines[0].contains(&format!("| {} |", std::process::id())));
    }

    #[test]
    fn test_current_user_not_empty() {
        assert!(!current_user().is_empty());
    }
}
