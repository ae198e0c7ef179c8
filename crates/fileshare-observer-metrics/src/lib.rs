//! Gauge publishing for fileshare-observer.
//!
//! [`MetricsPublisher`] is a thread-safe, last-value-wins register of named
//! gauges backed by a [`prometheus::Registry`]. The scheduler writes into it
//! through the [`GaugeSink`] trait and the exposition endpoint reads it with
//! [`render_text`]. It holds no history: every gauge only ever knows its most
//! recent value.

mod exposition;
pub mod gauges;
mod publisher;

pub use exposition::{CONTENT_TYPE, render_text};
pub use gauges::{publish_failure, publish_scan_result, publish_scan_duration};
pub use publisher::{GaugeSink, GaugeValue, MetricsPublisher};
