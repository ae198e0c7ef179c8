//! The scan loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fileshare_observer_core::{ScanError, ScanResult};
use fileshare_observer_metrics::{
    GaugeSink, publish_failure, publish_scan_duration, publish_scan_result,
};

use crate::source::ScanSource;
use crate::state::{CycleState, SchedulerPhase};

/// Drives a [`ScanSource`] on a fixed interval and publishes results into a
/// [`GaugeSink`].
///
/// The interval is measured from the start of one cycle to the start of the
/// next. A scan that overruns the interval is followed immediately by the
/// next one; scans never overlap.
pub struct ScanScheduler<S, P> {
    source: Arc<S>,
    sink: Arc<P>,
    interval: Duration,
    state_tx: watch::Sender<CycleState>,
}

impl<S: ScanSource, P: GaugeSink> ScanScheduler<S, P> {
    /// Create a scheduler. `interval` should be positive; a zero interval
    /// degenerates into back-to-back scans.
    pub fn new(source: S, sink: Arc<P>, interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(CycleState::default());
        Self {
            source: Arc::new(source),
            sink,
            interval,
            state_tx,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Snapshot of the current cycle state.
    pub fn state(&self) -> CycleState {
        self.state_tx.borrow().clone()
    }

    /// Watch cycle state changes.
    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.state_tx.subscribe()
    }

    /// Run cycles until `cancel` fires, then return the final state.
    ///
    /// Cancellation is observed while sleeping and, through the source,
    /// between entries of an in-flight scan. A scan interrupted by
    /// cancellation is abandoned without publishing.
    pub async fn run(&self, cancel: CancellationToken) -> CycleState {
        info!(
            root = %self.source.root().display(),
            interval_secs = self.interval.as_secs_f64(),
            "scheduler started"
        );

        while !cancel.is_cancelled() {
            let cycle_start = Instant::now();
            self.set_phase(SchedulerPhase::Scanning);

            let outcome = self.scan_once(&cancel).await;
            if cancel.is_cancelled() {
                debug!("scan abandoned on cancellation");
                break;
            }

            let elapsed = cycle_start.elapsed();
            match outcome {
                Ok(result) => self.publish(result, elapsed),
                Err(err) => self.record_failure(err, elapsed),
            }
            self.set_phase(SchedulerPhase::Idle);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(cycle_start + self.interval) => {}
            }
        }

        self.set_phase(SchedulerPhase::Stopped);
        let state = self.state();
        info!(cycles = state.cycles, failures = state.failures, "scheduler stopped");
        state
    }

    async fn scan_once(&self, cancel: &CancellationToken) -> Result<ScanResult, ScanError> {
        let source = Arc::clone(&self.source);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || source.scan(&cancel))
            .await
            .unwrap_or_else(|e| {
                Err(ScanError::Other {
                    message: e.to_string(),
                })
            })
    }

    fn publish(&self, result: ScanResult, elapsed: Duration) {
        publish_scan_result(self.sink.as_ref(), &result);
        publish_scan_duration(self.sink.as_ref(), elapsed);

        info!(
            root = %result.root.display(),
            dirs = result.directory_count,
            files = result.file_count,
            bytes = result.total_size_bytes,
            errors = result.error_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "scan published"
        );

        self.state_tx.send_modify(|state| {
            state.phase = SchedulerPhase::Published;
            state.last_result = Some(Arc::new(result));
            state.last_error = None;
            state.cycles += 1;
        });
    }

    fn record_failure(&self, err: ScanError, elapsed: Duration) {
        let mut failures = 0;
        self.state_tx.send_modify(|state| {
            state.phase = SchedulerPhase::Failed;
            state.last_error = Some(err.to_string());
            state.cycles += 1;
            state.failures += 1;
            failures = state.failures;
        });
        publish_failure(self.sink.as_ref(), failures);

        warn!(
            root = %self.source.root().display(),
            error = %err,
            failures,
            elapsed_ms = elapsed.as_millis() as u64,
            "scan failed, keeping previously published gauges"
        );
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        self.state_tx.send_modify(|state| state.phase = phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use fileshare_observer_metrics::{MetricsPublisher, gauges};

    struct FixedSource {
        root: PathBuf,
    }

    impl ScanSource for FixedSource {
        fn root(&self) -> &Path {
            &self.root
        }

        fn scan(&self, _cancel: &CancellationToken) -> Result<ScanResult, ScanError> {
            let mut result = ScanResult::empty(&self.root);
            result.file_count = 4;
            result.total_entries = 4;
            Ok(result)
        }
    }

    #[test]
    fn test_initial_state_idle() {
        let scheduler = ScanScheduler::new(
            FixedSource { root: "/share".into() },
            Arc::new(MetricsPublisher::new()),
            Duration::from_secs(30),
        );
        let state = scheduler.state();
        assert_eq!(state.phase, SchedulerPhase::Idle);
        assert!(state.last_result.is_none());
        assert_eq!(state.cycles, 0);
    }

    #[tokio::test]
    async fn test_cancel_during_sleep() {
        let publisher = Arc::new(MetricsPublisher::new());
        let scheduler = Arc::new(ScanScheduler::new(
            FixedSource { root: "/share".into() },
            Arc::clone(&publisher),
            Duration::from_secs(3600),
        ));
        let cancel = CancellationToken::new();
        let mut state_rx = scheduler.subscribe();

        let handle = {
            let scheduler = Arc::clone(&scheduler);
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        state_rx.wait_for(|s| s.cycles == 1).await.unwrap();
        cancel.cancel();

        let state = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(state.phase.is_stopped());
        assert_eq!(state.cycles, 1);
        assert_eq!(publisher.value(gauges::NUMBER_OF_FILES), Some(4.0));
        assert!(publisher.value(gauges::SCAN_DURATION).is_some());
    }
}
