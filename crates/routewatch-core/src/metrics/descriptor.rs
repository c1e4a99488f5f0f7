//! Metric identity: names, help text, kind, and label names.

use crate::error::{Result, RouteWatchError};

/// Instrument kind, used for the `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Naming options for a new metric.
///
/// The fully-qualified name is `namespace_subsystem_name` with empty parts
/// skipped.
#[derive(Debug, Clone, Default)]
pub struct MetricOpts {
    pub namespace: String,
    pub subsystem: String,
    pub name: String,
    pub help: String,
}

impl MetricOpts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    pub fn fq_name(&self) -> String {
        [&self.namespace, &self.subsystem, &self.name]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Immutable identity of a registered metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    fq_name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<String>,
}

impl MetricDescriptor {
    /// Validate names and build the descriptor.
    pub fn new(opts: &MetricOpts, kind: MetricKind, label_names: &[&str]) -> Result<Self> {
        let fq_name = opts.fq_name();
        if !is_valid_metric_name(&fq_name) {
            return Err(RouteWatchError::InvalidDescriptor(format!(
                "invalid metric name: {fq_name:?}"
            )));
        }

        let mut names: Vec<String> = Vec::with_capacity(label_names.len());
        for label in label_names {
            if !is_valid_label_name(label) || label.starts_with("__") {
                return Err(RouteWatchError::InvalidDescriptor(format!(
                    "{fq_name}: invalid label name: {label:?}"
                )));
            }
            if kind == MetricKind::Histogram && *label == "le" {
                return Err(RouteWatchError::InvalidDescriptor(format!(
                    "{fq_name}: label `le` is reserved for histogram buckets"
                )));
            }
            if names.iter().any(|n| n == label) {
                return Err(RouteWatchError::InvalidDescriptor(format!(
                    "{fq_name}: duplicate label name: {label}"
                )));
            }
            names.push((*label).to_string());
        }

        Ok(Self {
            fq_name,
            help: opts.help.clone(),
            kind,
            label_names: names,
        })
    }

    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
