//! Text exposition parser.
//!
//! Accepts `# HELP` / `# TYPE` comments, plain comments, blank lines, and
//! sample lines of the form `name{label="value",...} value [timestamp]`.
//! Malformed input is reported as `RouteWatchError::Parse`, never a panic.

use crate::error::{Result, RouteWatchError};
use crate::exposition::parse_float;
use crate::metrics::descriptor::{is_valid_label_name, is_valid_metric_name};

/// One sample line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
    pub timestamp_ms: Option<i64>,
}

impl ParsedSample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn has_labels(&self, labels: &[(&str, &str)]) -> bool {
        self.labels.len() == labels.len()
            && labels.iter().all(|(k, v)| self.label(k) == Some(*v))
    }
}

/// Parsed scrape body.
#[derive(Debug, Default)]
pub struct ParsedExposition {
    pub samples: Vec<ParsedSample>,
    /// `(metric, type)` from `# TYPE` lines.
    pub types: Vec<(String, String)>,
    /// `(metric, help)` from `# HELP` lines, unescaped.
    pub help: Vec<(String, String)>,
}

impl ParsedExposition {
    /// Value of the sample with exactly this name and label set.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.name == name && s.has_labels(labels))
            .map(|s| s.value)
    }

    pub fn type_of(&self, metric: &str) -> Option<&str> {
        self.types
            .iter()
            .find(|(m, _)| m == metric)
            .map(|(_, t)| t.as_str())
    }

    pub fn help_of(&self, metric: &str) -> Option<&str> {
        self.help
            .iter()
            .find(|(m, _)| m == metric)
            .map(|(_, h)| h.as_str())
    }

    /// All samples with this name, in input order.
    pub fn samples_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a ParsedSample> + 'a {
        self.samples.iter().filter(move |s| s.name == name)
    }
}

pub fn parse(text: &str) -> Result<ParsedExposition> {
    let mut out = ParsedExposition::default();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            parse_comment(comment.trim_start(), line_no, &mut out)?;
            continue;
        }
        out.samples.push(parse_sample(line, line_no)?);
    }
    Ok(out)
}

fn err(line: usize, reason: impl Into<String>) -> RouteWatchError {
    RouteWatchError::Parse {
        line,
        reason: reason.into(),
    }
}

fn parse_comment(comment: &str, line: usize, out: &mut ParsedExposition) -> Result<()> {
    let mut parts = comment.splitn(3, ' ');
    let keyword = parts.next().unwrap_or_default();
    if keyword != "HELP" && keyword != "TYPE" {
        return Ok(());
    }
    let metric = parts
        .next()
        .filter(|m| is_valid_metric_name(m))
        .ok_or_else(|| err(line, format!("{keyword} without a valid metric name")))?;
    let rest = parts.next().unwrap_or_default();

    if keyword == "TYPE" {
        match rest {
            "counter" | "gauge" | "histogram" | "summary" | "untyped" => {
                out.types.push((metric.to_string(), rest.to_string()));
            }
            other => return Err(err(line, format!("unknown metric type: {other:?}"))),
        }
    } else {
        out.help.push((metric.to_string(), unescape_help(rest)));
    }
    Ok(())
}

fn parse_sample(line: &str, line_no: usize) -> Result<ParsedSample> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .ok_or_else(|| err(line_no, "sample without a value"))?;
    let name = &line[..name_end];
    if !is_valid_metric_name(name) {
        return Err(err(line_no, format!("invalid metric name: {name:?}")));
    }

    let mut rest = &line[name_end..];
    let mut labels = Vec::new();
    if let Some(inner) = rest.strip_prefix('{') {
        let (parsed, after) = parse_labels(inner, line_no)?;
        labels = parsed;
        rest = after;
    }

    let mut fields = rest.split_whitespace();
    let raw_value = fields
        .next()
        .ok_or_else(|| err(line_no, "sample without a value"))?;
    let value = parse_float(raw_value)
        .ok_or_else(|| err(line_no, format!("invalid sample value: {raw_value:?}")))?;
    let timestamp_ms = match fields.next() {
        Some(ts) => Some(
            ts.parse::<i64>()
                .map_err(|_| err(line_no, format!("invalid timestamp: {ts:?}")))?,
        ),
        None => None,
    };
    if fields.next().is_some() {
        return Err(err(line_no, "trailing data after timestamp"));
    }

    Ok(ParsedSample {
        name: name.to_string(),
        labels,
        value,
        timestamp_ms,
    })
}

/// Parse `k="v",...}` and return the labels plus the text after `}`.
fn parse_labels(mut rest: &str, line: usize) -> Result<(Vec<(String, String)>, &str)> {
    let mut labels: Vec<(String, String)> = Vec::new();
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }

        let eq = rest
            .find('=')
            .ok_or_else(|| err(line, "label without `=`"))?;
        let key = rest[..eq].trim();
        if !is_valid_label_name(key) {
            return Err(err(line, format!("invalid label name: {key:?}")));
        }
        if labels.iter().any(|(k, _)| k == key) {
            return Err(err(line, format!("duplicate label: {key}")));
        }

        rest = rest[eq + 1..]
            .trim_start()
            .strip_prefix('"')
            .ok_or_else(|| err(line, "label value must be quoted"))?;

        let mut value = String::new();
        let mut close = None;
        let mut chars = rest.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, '"')) => value.push('"'),
                    _ => return Err(err(line, "invalid escape in label value")),
                },
                '"' => {
                    close = Some(i);
                    break;
                }
                c => value.push(c),
            }
        }
        let close = close.ok_or_else(|| err(line, "unterminated label value"))?;
        labels.push((key.to_string(), value));

        rest = rest[close + 1..].trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        } else {
            return Err(err(line, "expected `,` or `}` after label"));
        }
    }
}

fn unescape_help(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn parses_labels_values_and_comments() {
        let text = "\
# HELP demo_http_errors_total Total HTTP errors
# TYPE demo_http_errors_total counter
demo_http_errors_total{path=\"/error\"} 3
# a free-form comment

up 1 1700000000000
";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.type_of("demo_http_errors_total"), Some("counter"));
        assert_eq!(parsed.help_of("demo_http_errors_total"), Some("Total HTTP errors"));
        assert_eq!(parsed.value("demo_http_errors_total", &[("path", "/error")]), Some(3.0));
        assert_eq!(parsed.samples[1].timestamp_ms, Some(1_700_000_000_000));
        assert_eq!(parsed.value("up", &[]), Some(1.0));
    }

    #[test]
    fn unescapes_label_values() {
        let parsed = parse("m{a=\"x\\\"y\\\\z\\n\",b=\"\"} +Inf\n").unwrap();
        let s = &parsed.samples[0];
        assert_eq!(s.label("a"), Some("x\"y\\z\n"));
        assert_eq!(s.label("b"), Some(""));
        assert!(s.value.is_infinite());
    }

    #[test]
    fn tolerates_trailing_comma() {
        let parsed = parse("m{a=\"1\",} 2\n").unwrap();
        assert_eq!(parsed.value("m", &[("a", "1")]), Some(2.0));
    }

    #[test]
    fn rejects_malformed_lines() {
        for bad in [
            "m{a=\"1\"} \n",
            "m{a=1} 2\n",
            "m{a=\"1\" 2\n",
            "m{a=\"1\",a=\"2\"} 3\n",
            "9m 1\n",
            "m one\n",
            "m 1 2 3\n",
            "# TYPE m widget\n",
        ] {
            let e = parse(bad).expect_err(bad);
            assert_eq!(e.code().as_str(), "PARSE", "{bad}");
        }
    }

    #[test]
    fn reports_line_numbers() {
        match parse("ok 1\nbroken{\n") {
            Err(RouteWatchError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
