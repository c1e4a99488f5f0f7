//! Metric instruments and the registry that owns them.
//!
//! Series are stored in `DashMap`s keyed by the label values in descriptor
//! order, so observations on different routes only contend when they hash to
//! the same shard. Counters are plain atomics; histogram series take a short
//! per-series lock so a snapshot never sees a half-applied observation.

pub mod counter;
pub mod descriptor;
pub mod histogram;
pub mod registry;
pub mod snapshot;

pub use counter::CounterVec;
pub use descriptor::{MetricDescriptor, MetricKind, MetricOpts};
pub use histogram::{HistogramVec, DEFAULT_BUCKETS};
pub use registry::{Collector, MetricRegistry};
pub use snapshot::{HistogramSample, MetricFamily, SampleValue, SeriesSnapshot, Snapshot};

/// Label values in descriptor order.
pub(crate) type LabelValues = Vec<String>;

/// Build the series key, padding or truncating to the descriptor's arity.
pub(crate) fn label_key(descriptor: &MetricDescriptor, values: &[&str]) -> LabelValues {
    let expected = descriptor.label_names().len();
    if values.len() != expected {
        tracing::warn!(
            metric = %descriptor.fq_name(),
            expected,
            got = values.len(),
            "label value count mismatch"
        );
    }
    (0..expected)
        .map(|i| values.get(i).copied().unwrap_or_default().to_string())
        .collect()
}
