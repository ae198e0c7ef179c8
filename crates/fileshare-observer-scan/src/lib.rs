//! Tree walking and aggregate scanning for fileshare-observer.
//!
//! This crate walks a (possibly remote, possibly huge) directory tree once
//! and folds every entry into a [`ScanResult`]:
//!
//! - **Counts** of directories and files, and the total file size
//! - **Oldest / newest files** via bounded top-K heaps (`O(K)` memory)
//! - **Error tolerance**: unreadable entries are counted, never fatal
//! - **Cooperative cancellation** checked between entries
//!
//! # Example
//!
//! ```rust,no_run
//! use fileshare_observer_scan::{AggregateScanner, ScanConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ScanConfig::builder()
//!     .root(r"\\server\share")
//!     .top_k(3usize)
//!     .extension_filter(".sql")
//!     .build()
//!     .unwrap();
//! let scanner = AggregateScanner::new(config);
//! let result = scanner.scan(&CancellationToken::new()).unwrap();
//!
//! println!("{} files, {} bytes", result.file_count, result.total_size_bytes);
//! for file in &result.oldest_files {
//!     println!("old: {}", file.path.display());
//! }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use fileshare_observer_scan::{AggregateScanner, ScanConfig};
//!
//! let scanner = AggregateScanner::new(ScanConfig::new("/mnt/share"));
//! let mut progress_rx = scanner.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Scanned {} entries", progress.total_items());
//!     }
//! });
//! ```

mod progress;
mod scanner;
mod select;
mod walker;

pub use progress::ScanProgress;
pub use scanner::{AggregateScanner, Aggregator, MAX_RECORDED_WARNINGS};
pub use select::{NewestFiles, OldestFiles, TopK};
pub use walker::{JwalkWalker, TreeWalker, Walk, WalkItem};

// Re-export core types for convenience
pub use fileshare_observer_core::{
    CaseMatching, EntryKind, ExtensionFilter, FileStamp, ScanConfig, ScanError, ScanResult,
    ScanWarning, TreeEntry, WarningKind,
};
