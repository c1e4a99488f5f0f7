use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, RouteWatchError};
use crate::exposition;
use crate::metrics::counter::CounterVec;
use crate::metrics::descriptor::{MetricDescriptor, MetricOpts};
use crate::metrics::histogram::HistogramVec;
use crate::metrics::snapshot::{MetricFamily, SeriesSnapshot, Snapshot};

/// Anything the registry can export.
pub trait Collector: Send + Sync {
    fn descriptor(&self) -> &MetricDescriptor;

    /// Read every series. An error marks this metric as a render fault for
    /// the current scrape only.
    fn collect(&self) -> Result<Vec<SeriesSnapshot>>;
}

/// Process-wide set of metrics, keyed by fully-qualified name.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: DashMap<String, Arc<dyn Collector>>,
    render_faults: AtomicU64,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `DuplicateMetric` if the name is taken.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let name = collector.descriptor().fq_name().to_string();
        match self.metrics.entry(name) {
            Entry::Occupied(e) => Err(RouteWatchError::DuplicateMetric(e.key().clone())),
            Entry::Vacant(e) => {
                tracing::debug!(metric = %e.key(), "metric registered");
                e.insert(collector);
                Ok(())
            }
        }
    }

    pub fn register_counter(
        &self,
        opts: &MetricOpts,
        label_names: &[&str],
    ) -> Result<Arc<CounterVec>> {
        let counter = Arc::new(CounterVec::new(opts, label_names)?);
        self.register(counter.clone())?;
        Ok(counter)
    }

    pub fn register_histogram(
        &self,
        opts: &MetricOpts,
        label_names: &[&str],
        buckets: Option<&[f64]>,
    ) -> Result<Arc<HistogramVec>> {
        let histogram = Arc::new(HistogramVec::new(opts, label_names, buckets)?);
        self.register(histogram.clone())?;
        Ok(histogram)
    }

    pub fn contains(&self, fq_name: &str) -> bool {
        self.metrics.contains_key(fq_name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Number of metrics skipped by `render` since start.
    pub fn render_faults(&self) -> u64 {
        self.render_faults.load(Ordering::Relaxed)
    }

    /// Read all metrics, sorted by name.
    pub fn snapshot(&self) -> Snapshot {
        // Release the shard guards before collecting.
        let mut collectors: Vec<Arc<dyn Collector>> =
            self.metrics.iter().map(|r| Arc::clone(r.value())).collect();
        collectors.sort_by(|a, b| a.descriptor().fq_name().cmp(b.descriptor().fq_name()));

        let mut snapshot = Snapshot::default();
        for collector in collectors {
            match collector.collect() {
                Ok(series) => snapshot.families.push(MetricFamily {
                    descriptor: collector.descriptor().clone(),
                    series,
                }),
                Err(e) => snapshot.faults.push(e),
            }
        }
        snapshot
    }

    /// Render every metric in text exposition format, followed by `extra`
    /// unlabeled lines supplied by the caller.
    ///
    /// Metrics that fail to collect or encode are skipped and counted.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let snapshot = self.snapshot();
        let encoded = exposition::encode(&snapshot);

        let faults = snapshot.faults.iter().chain(encoded.faults.iter());
        for fault in faults {
            tracing::warn!(error = %fault, "metric skipped during scrape");
            self.render_faults.fetch_add(1, Ordering::Relaxed);
        }

        let mut out = encoded.text;
        for (name, v) in extra {
            exposition::write_line(&mut out, name, *v);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn opts(name: &str) -> MetricOpts {
        MetricOpts::new(name, "help").namespace("demo").subsystem("http")
    }

    struct Broken(MetricDescriptor);

    impl Collector for Broken {
        fn descriptor(&self) -> &MetricDescriptor {
            &self.0
        }

        fn collect(&self) -> Result<Vec<SeriesSnapshot>> {
            Err(RouteWatchError::render(self.0.fq_name(), "backing store unavailable"))
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let reg = MetricRegistry::new();
        reg.register_counter(&opts("errors_total"), &["path"]).unwrap();
        let err = reg
            .register_histogram(&opts("errors_total"), &["path"], None)
            .err()
            .expect("duplicate must fail");
        assert_eq!(err.code().as_str(), "DUPLICATE_METRIC");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn same_name_different_subsystem_is_allowed() {
        let reg = MetricRegistry::new();
        reg.register_counter(&opts("errors_total"), &[]).unwrap();
        reg.register_counter(&opts("errors_total").subsystem("grpc"), &[]).unwrap();
        assert!(reg.contains("demo_http_errors_total"));
        assert!(reg.contains("demo_grpc_errors_total"));
    }

    #[test]
    fn snapshot_is_sorted_and_reflects_observations() {
        let reg = MetricRegistry::new();
        let latency = reg
            .register_histogram(&opts("request_duration_seconds"), &["path"], None)
            .unwrap();
        let errors = reg.register_counter(&opts("errors_total"), &["path"]).unwrap();

        latency.observe(&["/"], 0.02);
        errors.inc(&["/error"]);

        let snap = reg.snapshot();
        let names: Vec<_> = snap.families.iter().map(|f| f.descriptor.fq_name()).collect();
        assert_eq!(names, vec!["demo_http_errors_total", "demo_http_request_duration_seconds"]);

        let h = snap
            .family("demo_http_request_duration_seconds")
            .and_then(|f| f.series(&["/"]))
            .and_then(|s| s.histogram())
            .unwrap();
        assert_eq!(h.count, 1);
        assert_eq!(
            snap.family("demo_http_errors_total")
                .and_then(|f| f.series(&["/error"]))
                .and_then(|s| s.counter()),
            Some(1)
        );
    }

    #[test]
    fn broken_collector_is_isolated() {
        let reg = MetricRegistry::new();
        let errors = reg.register_counter(&opts("errors_total"), &["path"]).unwrap();
        errors.inc(&["/error"]);
        let desc =
            MetricDescriptor::new(&opts("broken"), crate::metrics::MetricKind::Counter, &[])
                .unwrap();
        reg.register(Arc::new(Broken(desc))).unwrap();

        let body = reg.render(&[]);
        assert!(body.contains("demo_http_errors_total{path=\"/error\"} 1"));
        assert!(!body.contains("demo_http_broken"));
        assert_eq!(reg.render_faults(), 1);
    }

    #[test]
    fn extra_lines_are_appended() {
        let reg = MetricRegistry::new();
        let body = reg.render(&[("demo_draining", 0)]);
        assert!(body.ends_with("demo_draining 0\n"));
    }
}
