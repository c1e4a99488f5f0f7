use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::error::Result;
use crate::metrics::descriptor::{MetricDescriptor, MetricKind, MetricOpts};
use crate::metrics::registry::Collector;
use crate::metrics::snapshot::{SampleValue, SeriesSnapshot};
use crate::metrics::{label_key, LabelValues};

/// Monotonic counter partitioned by label values.
pub struct CounterVec {
    descriptor: MetricDescriptor,
    series: DashMap<LabelValues, AtomicU64>,
}

impl CounterVec {
    pub fn new(opts: &MetricOpts, label_names: &[&str]) -> Result<Self> {
        Ok(Self {
            descriptor: MetricDescriptor::new(opts, MetricKind::Counter, label_names)?,
            series: DashMap::new(),
        })
    }

    /// Increment by 1.
    pub fn inc(&self, label_values: &[&str]) {
        self.add(label_values, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, label_values: &[&str], v: u64) {
        let key = label_key(&self.descriptor, label_values);
        if let Some(counter) = self.series.get(&key) {
            counter.fetch_add(v, Ordering::Relaxed);
            return;
        }
        let counter = self.series.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value; 0 for a series never touched.
    pub fn get(&self, label_values: &[&str]) -> u64 {
        let key = label_key(&self.descriptor, label_values);
        self.series
            .get(&key)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl Collector for CounterVec {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    fn collect(&self) -> Result<Vec<SeriesSnapshot>> {
        let mut out: Vec<SeriesSnapshot> = self
            .series
            .iter()
            .map(|r| SeriesSnapshot {
                label_values: r.key().clone(),
                value: SampleValue::Counter(r.value().load(Ordering::Relaxed)),
            })
            .collect();
        out.sort_by(|a, b| a.label_values.cmp(&b.label_values));
        Ok(out)
    }
}
