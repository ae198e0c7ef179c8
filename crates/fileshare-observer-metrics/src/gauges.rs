//! Gauge names and the mapping from scan results to gauge values.

use std::time::{Duration, SystemTime};

use tracing::debug;

use fileshare_observer_core::ScanResult;

use crate::publisher::GaugeSink;

pub const NUMBER_OF_DIRECTORIES: &str = "number_of_directories";
pub const NUMBER_OF_FILES: &str = "number_of_files";
pub const FILESHARE_SIZE_BYTES: &str = "fileshare_size_bytes";
pub const NUMBER_OF_ENTRIES: &str = "number_of_entries";
pub const SCAN_ERRORS: &str = "fileshare_scan_errors";
pub const OLDEST_FILE_MTIME: &str = "fileshare_oldest_file_mtime_seconds";
pub const NEWEST_FILE_MTIME: &str = "fileshare_newest_file_mtime_seconds";
pub const LAST_SUCCESS_TIMESTAMP: &str = "fileshare_last_success_timestamp_seconds";
pub const SCAN_DURATION: &str = "fileshare_scan_duration_seconds";
pub const SCAN_FAILURES_TOTAL: &str = "fileshare_scan_failures_total";

/// Every gauge the observer publishes, with its help text.
pub const STANDARD: &[(&str, &str)] = &[
    (NUMBER_OF_DIRECTORIES, "Number of directories in the target file share"),
    (NUMBER_OF_FILES, "Number of files in the target file share"),
    (FILESHARE_SIZE_BYTES, "Total size of all files in the target file share in bytes"),
    (NUMBER_OF_ENTRIES, "Number of files and directories in the target file share"),
    (SCAN_ERRORS, "Entries skipped during the last successful scan because of I/O errors"),
    (OLDEST_FILE_MTIME, "Modification time of the oldest matching file (Unix seconds)"),
    (NEWEST_FILE_MTIME, "Modification time of the newest matching file (Unix seconds)"),
    (LAST_SUCCESS_TIMESTAMP, "Completion time of the last successful scan (Unix seconds)"),
    (SCAN_DURATION, "Wall-clock duration of the last scan cycle in seconds"),
    (SCAN_FAILURES_TOTAL, "Scan cycles that failed since the process started"),
];

fn unix_secs(time: SystemTime) -> f64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Publish the aggregates of a successful scan.
///
/// The extremal gauges are set to NaN when no file matched the filter, so a
/// stale mtime from an earlier cycle is never reported as current.
pub fn publish_scan_result<S: GaugeSink + ?Sized>(sink: &S, result: &ScanResult) {
    sink.set_gauge(NUMBER_OF_DIRECTORIES, result.directory_count as f64);
    sink.set_gauge(NUMBER_OF_FILES, result.file_count as f64);
    sink.set_gauge(FILESHARE_SIZE_BYTES, result.total_size_bytes as f64);
    sink.set_gauge(NUMBER_OF_ENTRIES, result.total_entries as f64);
    sink.set_gauge(SCAN_ERRORS, result.error_count as f64);

    let oldest = result.oldest_file().map_or(f64::NAN, |f| f.modified_unix_secs());
    let newest = result.newest_file().map_or(f64::NAN, |f| f.modified_unix_secs());
    sink.set_gauge(OLDEST_FILE_MTIME, oldest);
    sink.set_gauge(NEWEST_FILE_MTIME, newest);

    sink.set_gauge(LAST_SUCCESS_TIMESTAMP, unix_secs(result.completed_at));
    debug!(root = %result.root.display(), "published scan gauges");
}

/// Publish the measured duration of one scan cycle.
pub fn publish_scan_duration<S: GaugeSink + ?Sized>(sink: &S, duration: Duration) {
    sink.set_gauge(SCAN_DURATION, duration.as_secs_f64());
}

/// Publish the running count of failed cycles.
pub fn publish_failure<S: GaugeSink + ?Sized>(sink: &S, failures: u64) {
    sink.set_gauge(SCAN_FAILURES_TOTAL, failures as f64);
}
