use std::fmt::Write;

use crate::error::{Result, RouteWatchError};
use crate::exposition::format_float;
use crate::metrics::{HistogramSample, MetricFamily, MetricKind, SampleValue, Snapshot};

/// Encoder output: the scrape body plus the metrics that were left out of it.
#[derive(Debug, Default)]
pub struct Encoded {
    pub text: String,
    pub faults: Vec<RouteWatchError>,
}

/// Encode every family of the snapshot.
///
/// Each family is rendered into its own buffer and only appended when
/// complete, so a fault never leaves a partial metric in the body.
pub fn encode(snapshot: &Snapshot) -> Encoded {
    let mut out = Encoded::default();
    for family in &snapshot.families {
        match encode_family(family) {
            Ok(text) => out.text.push_str(&text),
            Err(e) => out.faults.push(e),
        }
    }
    out
}

/// Append an unlabeled `name value` line.
pub fn write_line(out: &mut String, name: &str, v: u64) {
    let _ = writeln!(out, "{} {}", name, v);
}

/// Append an unlabeled sample preceded by its `# HELP` and `# TYPE` lines.
pub fn write_typed_line(out: &mut String, name: &str, kind: &str, help: &str, v: u64) {
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
    write_line(out, name, v);
}

fn encode_family(family: &MetricFamily) -> Result<String> {
    let desc = &family.descriptor;
    let name = desc.fq_name();

    let mut out = String::new();
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(desc.help()));
    let _ = writeln!(out, "# TYPE {} {}", name, desc.kind().as_str());

    for series in &family.series {
        if series.label_values.len() != desc.label_names().len() {
            return Err(RouteWatchError::render(
                name,
                format!(
                    "series has {} label values, descriptor declares {}",
                    series.label_values.len(),
                    desc.label_names().len()
                ),
            ));
        }
        let labels: Vec<(&str, &str)> = desc
            .label_names()
            .iter()
            .map(String::as_str)
            .zip(series.label_values.iter().map(String::as_str))
            .collect();

        match (&series.value, desc.kind()) {
            (SampleValue::Counter(v), MetricKind::Counter) => {
                write_sample(&mut out, name, "", &labels, None, &v.to_string());
            }
            (SampleValue::Histogram(h), MetricKind::Histogram) => {
                check_histogram(name, h)?;
                for (bound, count) in &h.buckets {
                    let le = format_float(*bound);
                    let count = count.to_string();
                    write_sample(&mut out, name, "_bucket", &labels, Some(le.as_str()), &count);
                }
                let total = h.count.to_string();
                write_sample(&mut out, name, "_bucket", &labels, Some("+Inf"), &total);
                write_sample(&mut out, name, "_sum", &labels, None, &format_float(h.sum));
                write_sample(&mut out, name, "_count", &labels, None, &total);
            }
            _ => {
                return Err(RouteWatchError::render(
                    name,
                    format!("sample kind does not match declared type {}", desc.kind().as_str()),
                ));
            }
        }
    }
    Ok(out)
}

fn check_histogram(name: &str, h: &HistogramSample) -> Result<()> {
    if h.buckets.windows(2).any(|w| w[0].0 >= w[1].0) {
        return Err(RouteWatchError::render(name, "bucket bounds are not increasing"));
    }
    if h.buckets.windows(2).any(|w| w[0].1 > w[1].1) {
        return Err(RouteWatchError::render(name, "cumulative bucket counts decrease"));
    }
    if h.buckets.last().is_some_and(|(_, c)| *c > h.count) {
        return Err(RouteWatchError::render(name, "bucket count exceeds total count"));
    }
    Ok(())
}

fn write_sample(
    out: &mut String,
    name: &str,
    suffix: &str,
    labels: &[(&str, &str)],
    le: Option<&str>,
    value: &str,
) {
    out.push_str(name);
    out.push_str(suffix);

    let pairs = labels.iter().copied().chain(le.map(|le| ("le", le)));
    let mut first = true;
    for (k, v) in pairs {
        out.push(if first { '{' } else { ',' });
        first = false;
        let _ = write!(out, "{}=\"{}\"", k, escape_label(v));
    }
    if !first {
        out.push('}');
    }

    out.push(' ');
    out.push_str(value);
    out.push('\n');
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}
