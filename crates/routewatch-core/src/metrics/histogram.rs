use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;

use crate::error::{Result, RouteWatchError};
use crate::metrics::descriptor::{MetricDescriptor, MetricKind, MetricOpts};
use crate::metrics::registry::Collector;
use crate::metrics::snapshot::{HistogramSample, SampleValue, SeriesSnapshot};
use crate::metrics::{label_key, LabelValues};

/// Default latency buckets in seconds: 5ms .. 10s.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

struct HistogramState {
    /// Cumulative: slot `i` counts observations `<= bounds[i]`.
    cumulative: Vec<u64>,
    sum: f64,
    count: u64,
}

impl HistogramState {
    fn new(buckets: usize) -> Self {
        Self {
            cumulative: vec![0; buckets],
            sum: 0.0,
            count: 0,
        }
    }

    fn record(&mut self, bounds: &[f64], v: f64) {
        let first = bounds.partition_point(|b| *b < v);
        for slot in &mut self.cumulative[first..] {
            *slot += 1;
        }
        self.sum += v;
        self.count += 1;
    }
}

/// Fixed-bucket histogram partitioned by label values.
pub struct HistogramVec {
    descriptor: MetricDescriptor,
    bounds: Vec<f64>,
    series: DashMap<LabelValues, Mutex<HistogramState>>,
}

impl HistogramVec {
    /// Bounds must be finite and strictly increasing. `None` selects
    /// [`DEFAULT_BUCKETS`].
    pub fn new(opts: &MetricOpts, label_names: &[&str], buckets: Option<&[f64]>) -> Result<Self> {
        let descriptor = MetricDescriptor::new(opts, MetricKind::Histogram, label_names)?;
        let bounds = buckets.unwrap_or(&DEFAULT_BUCKETS).to_vec();
        validate_bounds(descriptor.fq_name(), &bounds)?;
        Ok(Self {
            descriptor,
            bounds,
            series: DashMap::new(),
        })
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Record one observation, in seconds.
    ///
    /// Negative and NaN values are dropped.
    pub fn observe(&self, label_values: &[&str], v: f64) {
        if v.is_nan() || v < 0.0 {
            tracing::warn!(
                metric = %self.descriptor.fq_name(),
                value = v,
                "rejected histogram observation"
            );
            return;
        }

        let key = label_key(&self.descriptor, label_values);
        if let Some(series) = self.series.get(&key) {
            lock(&series).record(&self.bounds, v);
            return;
        }
        let series = self
            .series
            .entry(key)
            .or_insert_with(|| Mutex::new(HistogramState::new(self.bounds.len())));
        lock(&series).record(&self.bounds, v);
    }

    pub fn observe_duration(&self, label_values: &[&str], d: Duration) {
        self.observe(label_values, d.as_secs_f64());
    }

    /// Current state of one series, if it has been observed.
    pub fn sample(&self, label_values: &[&str]) -> Option<HistogramSample> {
        let key = label_key(&self.descriptor, label_values);
        let series = self.series.get(&key)?;
        let sample = self.read(&series);
        Some(sample)
    }

    fn read(&self, series: &Mutex<HistogramState>) -> HistogramSample {
        let state = lock(series);
        HistogramSample {
            buckets: self
                .bounds
                .iter()
                .copied()
                .zip(state.cumulative.iter().copied())
                .collect(),
            sum: state.sum,
            count: state.count,
        }
    }
}

impl Collector for HistogramVec {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    fn collect(&self) -> Result<Vec<SeriesSnapshot>> {
        let mut out: Vec<SeriesSnapshot> = self
            .series
            .iter()
            .map(|r| SeriesSnapshot {
                label_values: r.key().clone(),
                value: SampleValue::Histogram(self.read(r.value())),
            })
            .collect();
        out.sort_by(|a, b| a.label_values.cmp(&b.label_values));
        Ok(out)
    }
}

// The critical section cannot panic, so a poisoned lock still guards
// consistent counts.
fn lock(series: &Mutex<HistogramState>) -> std::sync::MutexGuard<'_, HistogramState> {
    series.lock().unwrap_or_else(PoisonError::into_inner)
}

fn validate_bounds(metric: &str, bounds: &[f64]) -> Result<()> {
    if bounds.is_empty() {
        return Err(RouteWatchError::InvalidDescriptor(format!(
            "{metric}: histogram needs at least one bucket"
        )));
    }
    if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(RouteWatchError::InvalidDescriptor(format!(
            "{metric}: bucket bound must be finite, got {b}"
        )));
    }
    if bounds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(RouteWatchError::InvalidDescriptor(format!(
            "{metric}: bucket bounds must be strictly increasing"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn latency() -> HistogramVec {
        let opts = MetricOpts::new("request_duration_seconds", "HTTP request latency")
            .namespace("demo")
            .subsystem("http");
        HistogramVec::new(&opts, &["path"], None).unwrap()
    }

    #[test]
    fn increments_exactly_the_buckets_at_or_above_the_value() {
        let h = latency();
        h.observe(&["/"], 0.1);
        let s = h.sample(&["/"]).unwrap();
        for (bound, count) in &s.buckets {
            let expected = if *bound >= 0.1 { 1 } else { 0 };
            assert_eq!(*count, expected, "bucket le={bound}");
        }

        h.observe(&["/"], 0.003);
        let s = h.sample(&["/"]).unwrap();
        assert_eq!(s.bucket(0.005), Some(1));
        assert_eq!(s.bucket(0.05), Some(1));
        assert_eq!(s.bucket(0.1), Some(2));
        assert_eq!(s.bucket(10.0), Some(2));
    }

    #[test]
    fn value_on_a_bound_lands_in_that_bucket() {
        let h = latency();
        h.observe(&["/"], 0.25);
        let s = h.sample(&["/"]).unwrap();
        assert_eq!(s.bucket(0.1), Some(0));
        assert_eq!(s.bucket(0.25), Some(1));
    }

    #[test]
    fn sum_and_count_track_every_observation() {
        let h = latency();
        let values = [0.004, 0.2, 1.25, 3.0, 0.07];
        for v in values {
            h.observe(&["/slow"], v);
        }
        let s = h.sample(&["/slow"]).unwrap();
        assert_eq!(s.count, values.len() as u64);
        assert!((s.sum - values.iter().sum::<f64>()).abs() < 1e-12);
    }

    #[test]
    fn overflow_only_reaches_inf() {
        let h = latency();
        h.observe(&["/"], 42.0);
        let s = h.sample(&["/"]).unwrap();
        assert!(s.buckets.iter().all(|(_, c)| *c == 0));
        assert_eq!(s.bucket(f64::INFINITY), Some(1));
        assert_eq!(s.count, 1);
        assert_eq!(s.sum, 42.0);
    }

    #[test]
    fn cumulative_counts_never_decrease() {
        let h = latency();
        for v in [0.001, 0.02, 0.02, 0.7, 6.0, 11.0, 0.3] {
            h.observe(&["/"], v);
        }
        let s = h.sample(&["/"]).unwrap();
        assert!(s.buckets.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(s.buckets.last().unwrap().1 <= s.count);
    }

    #[test]
    fn rejects_negative_and_nan() {
        let h = latency();
        h.observe(&["/"], -0.5);
        h.observe(&["/"], f64::NAN);
        assert!(h.sample(&["/"]).is_none());
    }

    #[test]
    fn labels_are_isolated() {
        let h = latency();
        h.observe(&["A"], 0.5);
        h.observe(&["A"], 0.5);
        h.observe(&["B"], 2.0);
        assert_eq!(h.sample(&["A"]).unwrap().count, 2);
        let b = h.sample(&["B"]).unwrap();
        assert_eq!(b.count, 1);
        assert_eq!(b.bucket(1.0), Some(0));
    }

    #[test]
    fn custom_bounds_are_validated() {
        let opts = MetricOpts::new("x_seconds", "x");
        assert!(HistogramVec::new(&opts, &[], Some(&[][..])).is_err());
        assert!(HistogramVec::new(&opts, &[], Some(&[0.1, 0.1][..])).is_err());
        assert!(HistogramVec::new(&opts, &[], Some(&[0.5, 0.1][..])).is_err());
        assert!(HistogramVec::new(&opts, &[], Some(&[0.1, f64::INFINITY][..])).is_err());
        let h = HistogramVec::new(&opts, &[], Some(&[0.1, 1.0][..])).unwrap();
        assert_eq!(h.bounds(), &[0.1, 1.0]);
    }

    #[test]
    fn concurrent_observations_are_exact() {
        let h = Arc::new(latency());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let h = Arc::clone(&h);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        h.observe(&["/"], 0.1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let s = h.sample(&["/"]).unwrap();
        assert_eq!(s.count, 10_000);
        assert!((s.sum - 1_000.0).abs() < 1e-6);
        assert_eq!(s.bucket(0.1), Some(10_000));
        assert_eq!(s.bucket(0.05), Some(0));
    }
}
