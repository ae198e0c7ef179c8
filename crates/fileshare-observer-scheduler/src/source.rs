use std::path::Path;

use tokio_util::sync::CancellationToken;

use fileshare_observer_core::{ScanError, ScanResult};
use fileshare_observer_scan::{AggregateScanner, TreeWalker};

/// Something the scheduler can scan once per cycle.
///
/// `scan` is blocking and runs on tokio's blocking pool; it should check
/// `cancel` often enough to stop promptly.
pub trait ScanSource: Send + Sync + 'static {
    /// Root of the observed tree, for diagnostics.
    fn root(&self) -> &Path;

    /// Run one full scan.
    fn scan(&self, cancel: &CancellationToken) -> Result<ScanResult, ScanError>;
}

impl<W: TreeWalker + 'static> ScanSource for AggregateScanner<W> {
    fn root(&self) -> &Path {
        &self.config().root
    }

    fn scan(&self, cancel: &CancellationToken) -> Result<ScanResult, ScanError> {
        AggregateScanner::scan(self, cancel)
    }
}
