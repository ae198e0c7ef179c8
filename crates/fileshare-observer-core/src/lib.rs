//! Core types and configuration for fileshare-observer.
//!
//! This crate provides the data structures shared by the scanner, the
//! scheduler and the metrics layer: traversal entries, scan results,
//! configuration and error types.

mod config;
mod entry;
mod error;
mod result;

pub use config::{
    ActivitySettings, CaseMatching, ExtensionFilter, MetricsSettings, ObserverConfig,
    ScanConfig, ScanConfigBuilder,
};
pub use entry::{EntryKind, TreeEntry};
pub use error::{ConfigError, ScanError, ScanWarning, WarningKind};
pub use result::{FileStamp, ScanResult};
