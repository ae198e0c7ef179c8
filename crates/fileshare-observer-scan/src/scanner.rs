//! Single-pass aggregate scanner.

use std::cmp::Reverse;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use fileshare_observer_core::{
    ExtensionFilter, ScanConfig, ScanError, ScanResult, ScanWarning, TreeEntry,
};

use crate::progress::ScanProgress;
use crate::select::{NewestFiles, OldestFiles};
use crate::walker::{JwalkWalker, TreeWalker};

/// Entries between two progress snapshots.
const PROGRESS_EVERY: u64 = 1000;

/// Warnings kept verbatim in a result; the rest are only counted.
pub const MAX_RECORDED_WARNINGS: usize = 64;

/// Folds walk items into the aggregates of one scan.
///
/// Directory count, file count, total size and both bounded extremal
/// selections are all updated from the same entry, so a single traversal
/// yields the whole result.
#[derive(Debug)]
pub struct Aggregator {
    filter: ExtensionFilter,
    track_extremes: bool,
    oldest: OldestFiles,
    newest: NewestFiles,
    directory_count: u64,
    file_count: u64,
    total_size: u64,
    error_count: u64,
    warnings: Vec<ScanWarning>,
}

impl Aggregator {
    /// Create an aggregator retaining `top_k` oldest and newest files that
    /// pass `filter`.
    pub fn new(top_k: usize, filter: ExtensionFilter) -> Self {
        Self {
            filter,
            track_extremes: top_k > 0,
            oldest: OldestFiles::new(top_k),
            newest: NewestFiles::new(top_k),
            directory_count: 0,
            file_count: 0,
            total_size: 0,
            error_count: 0,
            warnings: Vec::new(),
        }
    }

    /// Fold one entry into the aggregates.
    pub fn record(&mut self, entry: &TreeEntry) {
        if entry.is_dir() {
            self.directory_count += 1;
            return;
        }

        self.file_count += 1;
        self.total_size += entry.size;

        if self.track_extremes && self.filter.matches(&entry.path) {
            self.oldest
                .offer(entry.modified, || entry.path.clone(), entry.modified, entry.size);
            self.newest.offer(
                Reverse(entry.modified),
                || entry.path.clone(),
                entry.modified,
                entry.size,
            );
        }
    }

    /// Count a skipped entry.
    pub fn record_warning(&mut self, warning: ScanWarning) {
        debug!(
            path = %warning.path.display(),
            kind = ?warning.kind,
            "skipped entry: {}",
            warning.message
        );
        self.error_count += 1;
        if self.warnings.len() < MAX_RECORDED_WARNINGS {
            self.warnings.push(warning);
        }
    }

    /// Entries folded so far (files + directories).
    pub fn entries(&self) -> u64 {
        self.directory_count + self.file_count
    }

    fn progress(&self, current_path: PathBuf, start: Instant) -> ScanProgress {
        ScanProgress {
            files_scanned: self.file_count,
            dirs_scanned: self.directory_count,
            bytes_scanned: self.total_size,
            current_path,
            errors_count: self.error_count,
            elapsed: start.elapsed(),
        }
    }

    /// Produce the immutable result.
    pub fn finish(self, root: PathBuf, started_at: SystemTime) -> ScanResult {
        ScanResult {
            root,
            directory_count: self.directory_count,
            file_count: self.file_count,
            total_entries: self.directory_count + self.file_count,
            total_size_bytes: self.total_size,
            oldest_files: self.oldest.into_sorted(),
            newest_files: self.newest.into_sorted(),
            started_at,
            completed_at: SystemTime::now(),
            error_count: self.error_count,
            warnings: self.warnings,
        }
    }
}

/// Computes directory/file counts, total size and the oldest/newest files
/// of a tree in one walk.
pub struct AggregateScanner<W = JwalkWalker> {
    config: ScanConfig,
    walker: W,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl AggregateScanner<JwalkWalker> {
    /// Create a scanner walking the config root with jwalk.
    pub fn new(config: ScanConfig) -> Self {
        let walker = JwalkWalker::from_config(&config);
        Self::with_walker(config, walker)
    }
}

impl<W: TreeWalker> AggregateScanner<W> {
    /// Create a scanner over a custom walker.
    pub fn with_walker(config: ScanConfig, walker: W) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            walker,
            progress_tx,
        }
    }

    /// The configuration this scanner runs with.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan the configured root once.
    ///
    /// Cancellation is checked before every entry, so a long walk over a
    /// slow share stops promptly with [`ScanError::Cancelled`]. A root that
    /// cannot be reached fails the whole scan; any other failure only
    /// increments the result's `error_count`.
    pub fn scan(&self, cancel: &CancellationToken) -> Result<ScanResult, ScanError> {
        let start = Instant::now();
        let started_at = SystemTime::now();
        let root = self.config.root.clone();

        let entries = self.walker.walk(&root)?;
        let mut aggregator =
            Aggregator::new(self.config.top_k, self.config.extension_filter());

        for item in entries {
            if cancel.is_cancelled() {
                debug!(root = %root.display(), entries = aggregator.entries(), "scan cancelled");
                return Err(ScanError::Cancelled);
            }

            let path = match item {
                Ok(entry) => {
                    aggregator.record(&entry);
                    entry.path
                }
                Err(warning) => {
                    let path = warning.path.clone();
                    aggregator.record_warning(warning);
                    path
                }
            };

            let seen = aggregator.entries() + aggregator.error_count;
            if seen % PROGRESS_EVERY == 0 && self.progress_tx.receiver_count() > 0 {
                let _ = self.progress_tx.send(aggregator.progress(path, start));
            }
        }

        let result = aggregator.finish(root, started_at);
        debug!(
            root = %result.root.display(),
            files = result.file_count,
            dirs = result.directory_count,
            errors = result.error_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scan complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use fileshare_observer_core::{CaseMatching, WarningKind};

    use crate::walker::Walk;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    /// Walker replaying a fixed list of items.
    struct ListWalker {
        items: Vec<Result<TreeEntry, ScanWarning>>,
    }

    impl TreeWalker for ListWalker {
        fn walk<'a>(&'a self, _root: &Path) -> Result<Walk<'a>, ScanError> {
            Ok(Box::new(self.items.iter().cloned()))
        }
    }

    struct OfflineWalker;

    impl TreeWalker for OfflineWalker {
        fn walk<'a>(&'a self, root: &Path) -> Result<Walk<'a>, ScanError> {
            Err(ScanError::root(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "network path not found"),
            ))
        }
    }

    fn scenario_items() -> Vec<Result<TreeEntry, ScanWarning>> {
        vec![
            Ok(TreeEntry::directory("/share/a", at(1))),
            Ok(TreeEntry::file("/share/a/two.txt", at(20), 20)),
            Ok(TreeEntry::directory("/share/b", at(1))),
            Ok(TreeEntry::file("/share/b/three.txt", at(30), 30)),
            Ok(TreeEntry::file("/share/one.txt", at(10), 10)),
        ]
    }

    fn scanner(
        items: Vec<Result<TreeEntry, ScanWarning>>,
        top_k: usize,
    ) -> AggregateScanner<ListWalker> {
        let config = ScanConfig::builder()
            .root("/share")
            .top_k(top_k)
            .build()
            .unwrap();
        AggregateScanner::with_walker(config, ListWalker { items })
    }

    #[test]
    fn test_single_pass_aggregates() {
        let result = scanner(scenario_items(), 1)
            .scan(&CancellationToken::new())
            .unwrap();

        assert_eq!(result.directory_count, 2);
        assert_eq!(result.file_count, 3);
        assert_eq!(result.total_entries, 5);
        assert_eq!(result.total_size_bytes, 60);
        assert_eq!(result.oldest_files.len(), 1);
        assert_eq!(result.oldest_files[0].path, PathBuf::from("/share/one.txt"));
        assert_eq!(result.newest_files[0].path, PathBuf::from("/share/b/three.txt"));
    }

    #[test]
    fn test_zero_top_k_selects_nothing() {
        let result = scanner(scenario_items(), 0)
            .scan(&CancellationToken::new())
            .unwrap();

        assert_eq!(result.file_count, 3);
        assert!(result.oldest_files.is_empty());
        assert!(result.newest_files.is_empty());
    }

    #[test]
    fn test_top_k_larger_than_file_count() {
        let result = scanner(scenario_items(), 10)
            .scan(&CancellationToken::new())
            .unwrap();

        let oldest: Vec<_> = result.oldest_files.iter().map(|f| f.size).collect();
        let newest: Vec<_> = result.newest_files.iter().map(|f| f.size).collect();
        assert_eq!(oldest, vec![10, 20, 30]);
        assert_eq!(newest, vec![30, 20, 10]);
    }

    #[test]
    fn test_warnings_counted_not_fatal() {
        let mut items = scenario_items();
        items.insert(1, Err(ScanWarning::permission_denied("/share/locked")));
        items.push(Err(ScanWarning::new(
            "/share/flaky.txt",
            "the specified network name is no longer available",
            WarningKind::MetadataError,
        )));

        let result = scanner(items, 1).scan(&CancellationToken::new()).unwrap();
        assert_eq!(result.error_count, 2);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.file_count, 3);
        assert_eq!(result.total_size_bytes, 60);
    }

    #[test]
    fn test_recorded_warnings_are_bounded() {
        let items = (0..MAX_RECORDED_WARNINGS as u64 + 10)
            .map(|i| Err(ScanWarning::permission_denied(format!("/share/{i}"))))
            .collect();

        let result = scanner(items, 1).scan(&CancellationToken::new()).unwrap();
        assert_eq!(result.error_count, MAX_RECORDED_WARNINGS as u64 + 10);
        assert_eq!(result.warnings.len(), MAX_RECORDED_WARNINGS);
    }

    #[test]
    fn test_root_unreachable_fails_scan() {
        let scanner =
            AggregateScanner::with_walker(ScanConfig::new(r"\\server\offline"), OfflineWalker);
        let err = scanner.scan(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ScanError::RootUnreachable { .. }));
    }

    #[test]
    fn test_cancelled_before_first_entry() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = scanner(scenario_items(), 1).scan(&cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_extension_filter_limits_selection_only() {
        let items: Vec<Result<TreeEntry, ScanWarning>> = vec![
            Ok(TreeEntry::file("/share/old.txt", at(1), 1)),
            Ok(TreeEntry::file("/share/mid.log", at(5), 1)),
            Ok(TreeEntry::file("/share/new.log", at(9), 1)),
            Ok(TreeEntry::file("/share/newest.txt", at(99), 1)),
        ];
        let filter = ExtensionFilter::new(".log", CaseMatching::Sensitive);
        let mut aggregator = Aggregator::new(2, filter);
        for entry in items.iter().flatten() {
            aggregator.record(entry);
        }
        let result = aggregator.finish(PathBuf::from("/share"), SystemTime::now());

        assert_eq!(result.file_count, 4);
        assert!(result
            .oldest_files
            .iter()
            .chain(&result.newest_files)
            .all(|f| f.path.extension().is_some_and(|e| e == "log")));
        assert_eq!(result.oldest_files[0].path, PathBuf::from("/share/mid.log"));
        assert_eq!(result.newest_files[0].path, PathBuf::from("/share/new.log"));
    }

    #[test]
    fn test_progress_broadcast() {
        let items = (0..2500u64)
            .map(|i| Ok(TreeEntry::file(format!("/share/{i}.dat"), at(i), 1)))
            .collect();
        let scanner = scanner(items, 1);
        let mut progress_rx = scanner.subscribe();

        scanner.scan(&CancellationToken::new()).unwrap();

        let first = progress_rx.try_recv().unwrap();
        assert_eq!(first.files_scanned, 1000);
        let second = progress_rx.try_recv().unwrap();
        assert_eq!(second.files_scanned, 2000);
        assert!(progress_rx.try_recv().is_err());
    }
}
