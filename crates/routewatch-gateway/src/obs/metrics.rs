use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use routewatch_core::error::Result;
use routewatch_core::exposition;
use routewatch_core::metrics::{CounterVec, HistogramVec, MetricOpts, MetricRegistry};

use crate::config::MetricsSection;

/// Label every HTTP metric is keyed by.
pub const ROUTE_LABEL: &str = "path";

/// Latency histogram and error counter, both keyed by route path.
pub struct HttpMetrics {
    registry: Arc<MetricRegistry>,
    latency: Arc<HistogramVec>,
    errors: Arc<CounterVec>,
    namespace: String,
    draining: AtomicBool,
}

impl HttpMetrics {
    /// Register `<ns>_<sub>_request_duration_seconds` and `<ns>_<sub>_errors_total`.
    ///
    /// Fails if either name is already taken in `registry`.
    pub fn new(registry: Arc<MetricRegistry>, cfg: &MetricsSection) -> Result<Self> {
        let latency = registry.register_histogram(
            &MetricOpts::new("request_duration_seconds", "HTTP request latency")
                .namespace(&cfg.namespace)
                .subsystem(&cfg.subsystem),
            &[ROUTE_LABEL],
            cfg.buckets.as_deref(),
        )?;
        let errors = registry.register_counter(
            &MetricOpts::new("errors_total", "Total HTTP errors")
                .namespace(&cfg.namespace)
                .subsystem(&cfg.subsystem),
            &[ROUTE_LABEL],
        )?;

        tracing::info!(
            latency = %latency_name(&cfg.namespace, &cfg.subsystem),
            "http metrics registered"
        );

        Ok(Self {
            registry,
            latency,
            errors,
            namespace: cfg.namespace.clone(),
            draining: AtomicBool::new(false),
        })
    }

    pub fn observe_latency(&self, route: &str, elapsed: Duration) {
        self.latency.observe_duration(&[route], elapsed);
    }

    pub fn record_error(&self, route: &str) {
        self.errors.inc(&[route]);
    }

    pub fn latency(&self) -> &HistogramVec {
        &self.latency
    }

    pub fn errors(&self) -> &CounterVec {
        &self.errors
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    /// Render the registry plus the render-fault count and draining flag.
    pub fn render(&self) -> String {
        let mut out = self.registry.render(&[]);
        exposition::write_typed_line(
            &mut out,
            &self.internal_name("scrape_render_faults_total"),
            "counter",
            "Metrics skipped while rendering a scrape",
            self.registry.render_faults(),
        );
        exposition::write_typed_line(
            &mut out,
            &self.internal_name("draining"),
            "gauge",
            "1 while the server is draining",
            u64::from(self.is_draining()),
        );
        out
    }

    fn internal_name(&self, name: &str) -> String {
        MetricOpts::new(name, "").namespace(&self.namespace).fq_name()
    }
}

fn latency_name(namespace: &str, subsystem: &str) -> String {
    MetricOpts::new("request_duration_seconds", "")
        .namespace(namespace)
        .subsystem(subsystem)
        .fq_name()
}
