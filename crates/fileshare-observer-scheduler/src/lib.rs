//! Fixed-cadence scan scheduling for fileshare-observer.
//!
//! [`ScanScheduler`] runs one scan per interval, publishes each successful
//! result as gauges and keeps the previous values in place when a cycle
//! fails. At most one scan is in flight at any time.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use fileshare_observer_metrics::MetricsPublisher;
//! use fileshare_observer_scan::{AggregateScanner, ScanConfig};
//! use fileshare_observer_scheduler::ScanScheduler;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let scanner = AggregateScanner::new(ScanConfig::new(r"\\server\share"));
//! let publisher = Arc::new(MetricsPublisher::with_standard_gauges());
//! let scheduler = ScanScheduler::new(scanner, publisher, Duration::from_secs(30));
//!
//! let cancel = CancellationToken::new();
//! let state = scheduler.run(cancel).await;
//! println!("stopped after {} cycles", state.cycles);
//! # }
//! ```

mod scheduler;
mod source;
mod state;

pub use scheduler::ScanScheduler;
pub use source::ScanSource;
pub use state::{CycleState, SchedulerPhase};
