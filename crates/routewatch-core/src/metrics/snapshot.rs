//! Point-in-time views of registry state, consumed by the exposition encoder.

use crate::error::RouteWatchError;
use crate::metrics::descriptor::MetricDescriptor;

/// Histogram accumulator as read under its series lock.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    /// `(upper_bound, cumulative_count)` for every finite bound, ascending.
    /// The `+Inf` bucket is implied by `count`.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramSample {
    /// Cumulative count for the bucket with exactly this upper bound.
    pub fn bucket(&self, le: f64) -> Option<u64> {
        if le.is_infinite() && le > 0.0 {
            return Some(self.count);
        }
        self.buckets
            .iter()
            .find(|(bound, _)| *bound == le)
            .map(|(_, count)| *count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Counter(u64),
    Histogram(HistogramSample),
}

/// One labeled series of a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    /// Values in the order of the descriptor's label names.
    pub label_values: Vec<String>,
    pub value: SampleValue,
}

impl SeriesSnapshot {
    pub fn counter(&self) -> Option<u64> {
        match &self.value {
            SampleValue::Counter(v) => Some(*v),
            SampleValue::Histogram(_) => None,
        }
    }

    pub fn histogram(&self) -> Option<&HistogramSample> {
        match &self.value {
            SampleValue::Histogram(h) => Some(h),
            SampleValue::Counter(_) => None,
        }
    }
}

/// All series of one metric, sorted by label values.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub descriptor: MetricDescriptor,
    pub series: Vec<SeriesSnapshot>,
}

impl MetricFamily {
    pub fn series(&self, label_values: &[&str]) -> Option<&SeriesSnapshot> {
        self.series.iter().find(|s| {
            s.label_values.len() == label_values.len()
                && s.label_values.iter().zip(label_values).all(|(a, b)| a == b)
        })
    }
}

/// Registry snapshot.
///
/// Each series is internally consistent; different series may have been read
/// at slightly different instants.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Sorted by fully-qualified metric name.
    pub families: Vec<MetricFamily>,
    /// Metrics whose collector failed while the snapshot was taken.
    pub faults: Vec<RouteWatchError>,
}

impl Snapshot {
    pub fn family(&self, fq_name: &str) -> Option<&MetricFamily> {
        self.families
            .iter()
            .find(|f| f.descriptor.fq_name() == fq_name)
    }
}
