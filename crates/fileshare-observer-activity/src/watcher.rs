//! Bridges notify callbacks into an async event stream.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::error::{ActivityError, Result};
use crate::event::ActivityEvent;

/// Events buffered between the notify thread and the consumer.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Recursive change watcher on one root.
///
/// Events arrive on notify's own thread and are pushed into a bounded
/// channel; a full channel blocks that thread until the consumer catches up.
pub struct ActivityWatcher {
    root: PathBuf,
    watcher: RecommendedWatcher,
    rx: mpsc::Receiver<ActivityEvent>,
}

impl ActivityWatcher {
    /// Start watching `root` recursively.
    pub fn start(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_capacity(root, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(root: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let root = root.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let watch_error = |source| ActivityError::Watch {
            path: root.clone(),
            source,
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for activity in ActivityEvent::from_notify(&event) {
                        debug!(event = %activity, "file share activity");
                        if tx.blocking_send(activity).is_err() {
                            // Consumer is gone; nothing left to deliver to.
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "watch error"),
            },
            Config::default(),
        )
        .map_err(watch_error)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(watch_error)?;
        info!(root = %root.display(), "watching for activity");

        Ok(Self { root, watcher, rx })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turn the watcher into a stream of events. Watching stops when the
    /// stream is dropped.
    pub fn into_stream(self) -> ActivityStream {
        ActivityStream {
            events: ReceiverStream::new(self.rx),
            _watcher: self.watcher,
        }
    }
}

/// Lazy sequence of activity events from an [`ActivityWatcher`].
pub struct ActivityStream {
    events: ReceiverStream<ActivityEvent>,
    _watcher: RecommendedWatcher,
}

impl Stream for ActivityStream {
    type Item = ActivityEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().events).poll_next(cx)
    }
}
