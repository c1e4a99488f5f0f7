//! Per-route HTTP metrics shared by the instrumentation wrapper, the demo
//! handlers, and the `/metrics` handler.

pub mod metrics;

pub use metrics::HttpMetrics;
