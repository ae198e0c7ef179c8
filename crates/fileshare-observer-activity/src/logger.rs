use std::fs::File;
use std::io::{BufWriter, Write};

use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::Result;
use crate::event::ActivityEvent;
use crate::log::ActivityLog;

/// Drains an activity stream into an [`ActivityLog`].
pub struct ActivityLogger<W: Write = BufWriter<File>> {
    log: ActivityLog<W>,
}

impl<W: Write> ActivityLogger<W> {
    pub fn new(log: ActivityLog<W>) -> Self {
        Self { log }
    }

    /// Write one record per event until `cancel` fires or the stream ends.
    ///
    /// Returns the number of records written.
    pub async fn run<S>(&mut self, mut events: S, cancel: CancellationToken) -> Result<u64>
    where
        S: Stream<Item = ActivityEvent> + Unpin,
    {
        let mut written = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.next() => match event {
                    Some(event) => {
                        self.log.append(&event)?;
                        written += 1;
                    }
                    None => break,
                },
            }
        }
        info!(log = %self.log.path().display(), records = written, "activity logger stopped");
        Ok(written)
    }

    /// Run on its own task, logging a failure as soon as it stops the logger.
    ///
    /// The handle resolves with the outcome of [`run`](Self::run).
    pub fn spawn<S>(mut self, events: S, cancel: CancellationToken) -> JoinHandle<Result<u64>>
    where
        W: Send + 'static,
        S: Stream<Item = ActivityEvent> + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = self.run(events, cancel).await;
            if let Err(e) = &outcome {
                error!(log = %self.log.path().display(), error = %e, "activity logging stopped");
            }
            outcome
        })
    }

    pub fn into_log(self) -> ActivityLog<W> {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ActivityKind;

    fn memory_logger() -> ActivityLogger<Vec<u8>> {
        ActivityLogger::new(ActivityLog::from_writer(Vec::new(), "memory").with_user("svc"))
    }

    #[tokio::test]
    async fn test_drains_until_stream_ends() {
        let events = tokio_stream::iter(vec![
            ActivityEvent::new(ActivityKind::Created, "/share/a.txt", false),
            ActivityEvent::new(ActivityKind::Modified, "/share/a.txt", false),
            ActivityEvent::new(ActivityKind::Deleted, "/share/a.txt", false),
        ]);

        let mut logger = memory_logger();
        let written = logger.run(events, CancellationToken::new()).await.unwrap();
        assert_eq!(written, 3);

        let text = String::from_utf8(logger.into_log().into_inner()).unwrap();
        let messages: Vec<_> = text
            .lines()
            .map(|line| line.split(" | ").nth(2).unwrap().to_string())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Created file: /share/a.txt",
                "Modified file: /share/a.txt",
                "Deleted file: /share/a.txt",
            ]
        );
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_spawned_logger_fails_without_waiting_for_cancel() {
        let events = tokio_stream::iter(vec![ActivityEvent::new(
            ActivityKind::Created,
            "/share/a.txt",
            false,
        )])
        .chain(tokio_stream::pending());
        let logger = ActivityLogger::new(ActivityLog::from_writer(FullDisk, "full"));
        let cancel = CancellationToken::new();

        let handle = logger.spawn(events, cancel.clone());
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("failed logger kept running")
            .unwrap();

        assert!(outcome.is_err());
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_stops_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut logger = memory_logger();
        let written = logger
            .run(tokio_stream::pending::<ActivityEvent>(), cancel)
            .await
            .unwrap();
        assert_eq!(written, 0);
    }
}
