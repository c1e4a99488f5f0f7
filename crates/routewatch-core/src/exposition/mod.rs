//! Text exposition format (version 0.0.4).
//!
//! `encode` turns a registry snapshot into scrape text, one metric at a
//! time, so a metric that cannot be rendered is dropped on its own instead of
//! failing the whole body. `parse` reads the same grammar back and is used to
//! verify what a scraper would see.

pub mod encode;
pub mod parse;

pub use encode::{encode, write_line, write_typed_line, Encoded};
pub use parse::{parse, ParsedExposition, ParsedSample};

/// `Content-Type` of a scrape response.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Float rendering shared by the encoder and bucket `le` labels.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

/// Inverse of [`format_float`]; also accepts `Inf`/`-Inf` spellings.
pub fn parse_float(s: &str) -> Option<f64> {
    match s {
        "+Inf" | "Inf" | "+inf" | "inf" => Some(f64::INFINITY),
        "-Inf" | "-inf" => Some(f64::NEG_INFINITY),
        "NaN" | "nan" => Some(f64::NAN),
        _ => s.parse().ok(),
    }
}
