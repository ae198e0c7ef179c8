//! Last-value-wins gauge register backed by a Prometheus registry.

use std::fmt;
use std::time::SystemTime;

use compact_str::CompactString;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use prometheus::{Gauge, Opts, Registry};
use tracing::warn;

use crate::gauges;

/// Write side of a gauge register.
///
/// The scheduler only depends on this trait, so tests can substitute a
/// recording fake for the real publisher.
pub trait GaugeSink: Send + Sync {
    /// Overwrite the current value of `name`.
    fn set_gauge(&self, name: &str, value: f64);
}

/// Current value of one gauge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeValue {
    /// Most recently published value.
    pub value: f64,
    /// When it was published.
    pub updated_at: SystemTime,
}

struct Published {
    gauge: Gauge,
    updated_at: SystemTime,
}

/// Thread-safe register of named gauges.
///
/// Each gauge is a [`prometheus::Gauge`], registered in the publisher's own
/// [`Registry`] the first time it is set. Each gauge is updated atomically on
/// its own; readers may observe a mix of values from consecutive cycles
/// across different gauges, but never a torn single value. Gauges are never
/// cleared once set.
#[derive(Default)]
pub struct MetricsPublisher {
    registry: Registry,
    gauges: DashMap<CompactString, Published>,
    help: DashMap<CompactString, CompactString>,
}

impl MetricsPublisher {
    /// Create an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a publisher with help text registered for every gauge the
    /// observer publishes.
    pub fn with_standard_gauges() -> Self {
        let publisher = Self::new();
        for (name, help) in gauges::STANDARD {
            publisher.describe(name, help);
        }
        publisher
    }

    /// Register help text shown by the exposition format.
    ///
    /// Only takes effect for gauges not yet published.
    pub fn describe(&self, name: &str, help: &str) {
        self.help.insert(CompactString::new(name), CompactString::new(help));
    }

    /// Overwrite the current value of `name`.
    ///
    /// A name the registry rejects is logged and dropped.
    pub fn set_gauge(&self, name: &str, value: f64) {
        let updated_at = SystemTime::now();
        if let Some(mut current) = self.gauges.get_mut(name) {
            current.gauge.set(value);
            current.updated_at = updated_at;
            return;
        }

        match self.gauges.entry(CompactString::new(name)) {
            Entry::Occupied(mut current) => {
                let current = current.get_mut();
                current.gauge.set(value);
                current.updated_at = updated_at;
            }
            Entry::Vacant(slot) => match self.register(name) {
                Ok(gauge) => {
                    gauge.set(value);
                    slot.insert(Published { gauge, updated_at });
                }
                Err(e) => warn!(gauge = name, error = %e, "cannot register gauge"),
            },
        }
    }

    fn register(&self, name: &str) -> prometheus::Result<Gauge> {
        // Prometheus requires non-empty help.
        let help = self.help(name).unwrap_or_else(|| CompactString::new(name));
        let gauge = Gauge::with_opts(Opts::new(name, help.as_str()))?;
        self.registry.register(Box::new(gauge.clone()))?;
        Ok(gauge)
    }

    /// Current value of `name`, or `None` before it was first published.
    pub fn get_gauge(&self, name: &str) -> Option<GaugeValue> {
        self.gauges.get(name).map(|entry| GaugeValue {
            value: entry.gauge.get(),
            updated_at: entry.updated_at,
        })
    }

    /// Current numeric value of `name`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.get_gauge(name).map(|gauge| gauge.value)
    }

    /// Registered help text for `name`.
    pub fn help(&self, name: &str) -> Option<CompactString> {
        self.help.get(name).map(|entry| entry.value().clone())
    }

    /// Registry holding every published gauge.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// All published gauges, sorted by name.
    pub fn snapshot(&self) -> Vec<(CompactString, GaugeValue)> {
        let mut gauges: Vec<_> = self
            .gauges
            .iter()
            .map(|entry| {
                let value = GaugeValue {
                    value: entry.gauge.get(),
                    updated_at: entry.updated_at,
                };
                (entry.key().clone(), value)
            })
            .collect();
        gauges.sort_by(|a, b| a.0.cmp(&b.0));
        gauges
    }

    /// Number of published gauges.
    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    /// Check if nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }
}

impl fmt::Debug for MetricsPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsPublisher")
            .field("gauges", &self.gauges.len())
            .field("described", &self.help.len())
            .finish()
    }
}

impl GaugeSink for MetricsPublisher {
    fn set_gauge(&self, name: &str, value: f64) {
        MetricsPublisher::set_gauge(self, name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_absent_before_first_set() {
        let publisher = MetricsPublisher::new();
        assert!(publisher.get_gauge("number_of_files").is_none());
        assert!(publisher.is_empty());
        assert!(publisher.registry().gather().is_empty());
    }

    #[test]
    fn test_last_value_wins() {
        let publisher = MetricsPublisher::new();
        publisher.set_gauge("number_of_files", 3.0);
        publisher.set_gauge("number_of_files", 7.0);

        assert_eq!(publisher.value("number_of_files"), Some(7.0));
        assert_eq!(publisher.len(), 1);
    }

    #[test]
    fn test_set_registers_once() {
        let publisher = MetricsPublisher::with_standard_gauges();
        publisher.set_gauge(gauges::NUMBER_OF_FILES, 3.0);
        publisher.set_gauge(gauges::NUMBER_OF_FILES, 4.0);

        let families = publisher.registry().gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), gauges::NUMBER_OF_FILES);
        assert_eq!(families[0].get_help(), "Number of files in the target file share");
        assert_eq!(families[0].get_metric()[0].get_gauge().get_value(), 4.0);
    }

    #[test]
    fn test_invalid_name_is_dropped() {
        let publisher = MetricsPublisher::new();
        publisher.set_gauge("not a metric name", 1.0);

        assert!(publisher.get_gauge("not a metric name").is_none());
        assert!(publisher.is_empty());
    }

    #[test]
    fn test_snapshot_sorted() {
        let publisher = MetricsPublisher::new();
        publisher.set_gauge("zeta", 1.0);
        publisher.set_gauge("alpha", 2.0);

        let names: Vec<_> = publisher
            .snapshot()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_standard_gauges_have_help() {
        let publisher = MetricsPublisher::with_standard_gauges();
        assert!(publisher.help(gauges::NUMBER_OF_FILES).is_some());
        assert!(publisher.help(gauges::FILESHARE_SIZE_BYTES).is_some());
        // Describing does not publish.
        assert!(publisher.is_empty());
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let publisher = Arc::new(MetricsPublisher::new());
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let publisher = Arc::clone(&publisher);
                thread::spawn(move || {
                    for i in 0..1000 {
                        publisher.set_gauge(&format!("gauge_{w}"), i as f64);
                    }
                })
            })
            .collect();
        let reader = {
            let publisher = Arc::clone(&publisher);
            thread::spawn(move || {
                for _ in 0..1000 {
                    let _ = publisher.snapshot();
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        for w in 0..4 {
            assert_eq!(publisher.value(&format!("gauge_{w}")), Some(999.0));
        }
    }
}
