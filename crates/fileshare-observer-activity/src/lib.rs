//! File share activity logging.
//!
//! Watches a root for create, modify, delete and move notifications and
//! appends one line per change to a plain log file:
//!
//! ```text
//! 2023-06-01 09:05:07 | 4242 | Created file: \\server\share\a.txt | userid: svc-share
//! ```
//!
//! This runs independently of the scan pipeline and shares no state with it.
//!
//! # Example
//!
//! ```rust,no_run
//! use fileshare_observer_activity::{ActivityLog, ActivityLogger, ActivityWatcher};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> fileshare_observer_activity::Result<()> {
//! let events = ActivityWatcher::start("/mnt/share")?.into_stream();
//! let mut logger = ActivityLogger::new(ActivityLog::open("FileshareActivity.log")?);
//! let written = logger.run(events, CancellationToken::new()).await?;
//! println!("{written} records");
//! # Ok(())
//! # }
//! ```

mod error;
mod event;
mod log;
mod logger;
mod watcher;

pub use error::{ActivityError, Result};
pub use event::{ActivityEvent, ActivityKind};
pub use log::{ActivityLog, DEFAULT_LOG_FILE, current_user, format_record};
pub use logger::ActivityLogger;
pub use watcher::{ActivityStream, ActivityWatcher, DEFAULT_CAPACITY};
